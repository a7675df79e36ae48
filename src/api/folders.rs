const FOLDER_PAGE_SIZE: u32 = 100;

pub fn inbox_children_endpoint(root: &str) -> String {
    format!("/{root}/mailFolders/inbox/childFolders")
}

pub fn children_query() -> Vec<(String, String)> {
    vec![
        ("$top".to_string(), FOLDER_PAGE_SIZE.to_string()),
        ("$select".to_string(), "id,displayName".to_string()),
    ]
}
