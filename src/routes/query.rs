use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub count: Option<i64>,
}
