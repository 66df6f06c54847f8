use rkyv::{Archive, Serialize};

#[derive(Archive, Serialize, Debug)]
pub struct TermRecord {
    pub id: String,
    pub primary_name: String,
    pub secondary_name: Option<String>,
    pub category: String,
    pub short_definition: String,
    pub full_explanation: String,
    pub related_terms: Vec<String>,
}

#[derive(Archive, Serialize, Debug)]
pub struct CatalogStore {
    pub terms: Vec<TermRecord>,
}
