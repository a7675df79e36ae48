mod config {
    pub use mailtriage::config::*;
}

mod error {
    pub use mailtriage::error::*;
}

mod callback {
    pub use mailtriage::auth::callback::*;
}

mod token {
    pub use mailtriage::auth::token::*;
}

mod token_store {
    pub use mailtriage::auth::token_store::*;
}

mod oauth_under_test {
    #![allow(dead_code)]

    include!("../src/auth/oauth.rs");

    use std::sync::Mutex;

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct MemoryStore {
        token: Mutex<Option<TokenSet>>,
    }

    impl TokenStore for MemoryStore {
        fn load(&self, _profile: &str) -> AppResult<Option<TokenSet>> {
            Ok(self.token.lock().expect("lock").clone())
        }

        fn save(&self, _profile: &str, token: &TokenSet) -> AppResult<()> {
            *self.token.lock().expect("lock") = Some(token.clone());
            Ok(())
        }

        fn clear(&self, _profile: &str) -> AppResult<()> {
            *self.token.lock().expect("lock") = None;
            Ok(())
        }
    }

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            client_id: Some("client-123".to_string()),
            client_secret: Some("secret-456".to_string()),
            tenant_id: Some("contoso".to_string()),
            authority_host: Some(server.uri()),
            ..Settings::default()
        }
    }

    fn expired_token() -> TokenSet {
        TokenSet {
            access_token: "stale".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at_unix: Some(1),
            token_type: Some("Bearer".to_string()),
            scope: None,
            email: Some("owner@contoso.com".to_string()),
        }
    }

    #[tokio::test]
    async fn refresh_exchanges_expired_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "Mail.ReadWrite"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::default();
        store.save("default", &expired_token()).expect("seed");

        let refreshed = AuthService::refresh("default", &settings_for(&server), &store)
            .await
            .expect("refresh");

        assert_eq!(refreshed.access_token, "fresh");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(refreshed.email.as_deref(), Some("owner@contoso.com"));
        assert!(!refreshed.is_expired(SystemTime::now()));

        let stored = store.load("default").expect("load").expect("token");
        assert_eq!(stored.access_token, "fresh");
    }

    #[tokio::test]
    async fn refresh_errors_surface_oauth_description() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS70008: The refresh token has expired.\r\nTrace ID: 1"
            })))
            .mount(&server)
            .await;

        let store = MemoryStore::default();
        store.save("default", &expired_token()).expect("seed");

        let err = AuthService::refresh("default", &settings_for(&server), &store)
            .await
            .expect_err("invalid grant");
        let message = err.to_string();
        assert!(message.contains("invalid_grant"));
        assert!(message.contains("AADSTS70008"));
        assert!(!message.contains("Trace ID"));
    }

    #[tokio::test]
    async fn client_credentials_request_default_scope() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_secret=secret-456"))
            .and(body_string_contains(
                "scope=https%3A%2F%2Fgraph.microsoft.com%2F.default",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = AuthService::client_credentials(&settings_for(&server))
            .await
            .expect("app token");
        assert_eq!(token.access_token, "app-token");
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn logout_only_clears_local_token() {
        let store = MemoryStore::default();
        store.save("default", &expired_token()).expect("seed");

        let status = AuthService::logout("default", &store).await.expect("logout");
        assert!(!status.logged_in);
        assert_eq!(status.note.as_deref(), Some("local credentials removed"));
        assert!(store.load("default").expect("load").is_none());

        let status = AuthService::logout("default", &store).await.expect("logout");
        assert_eq!(status.note.as_deref(), Some("no local credentials to remove"));
    }

    #[tokio::test]
    async fn status_reports_expired_token() {
        let store = MemoryStore::default();
        store.save("default", &expired_token()).expect("seed");

        let status = AuthService::status("default", &store).await.expect("status");
        assert!(status.logged_in);
        assert_eq!(status.expired, Some(true));
        assert_eq!(status.has_refresh_token, Some(true));
        assert_eq!(status.email.as_deref(), Some("owner@contoso.com"));
    }
}
