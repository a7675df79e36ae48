const MESSAGE_SELECT_FIELDS: &str = "id,subject,from,body,isRead";

pub fn unread_endpoint(root: &str) -> String {
    format!("/{root}/mailFolders/inbox/messages")
}

pub fn message_endpoint(root: &str, id: &str) -> String {
    format!("/{root}/messages/{id}")
}

pub fn move_endpoint(root: &str, id: &str) -> String {
    format!("/{root}/messages/{id}/move")
}

pub fn drafts_endpoint(root: &str) -> String {
    format!("/{root}/messages")
}

pub fn unread_query(limit: u32) -> Vec<(String, String)> {
    vec![
        ("$filter".to_string(), "isRead eq false".to_string()),
        ("$top".to_string(), limit.to_string()),
        ("$select".to_string(), MESSAGE_SELECT_FIELDS.to_string()),
    ]
}
