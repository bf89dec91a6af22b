use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
  pub id: i64,
  pub user_id: String,
  pub name: String,
  pub created_at: Option<DateTime<Utc>>,
}
