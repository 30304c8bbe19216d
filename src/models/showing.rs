use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ShowingId = Uuid;

/// Сеанс: фильм в конкретном кинотеатре с фиксированной вместимостью.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showing {
    pub id: ShowingId,
    pub movie_name: String,
    pub theatre_name: String,
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

impl Showing {
    /// Естественный ключ (фильм, кинотеатр) сравнивается без учёта регистра.
    pub fn matches(&self, movie_name: &str, theatre_name: &str) -> bool {
        self.movie_name.eq_ignore_ascii_case(movie_name)
            && self.theatre_name.eq_ignore_ascii_case(theatre_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShowing {
    pub movie_name: String,
    pub theatre_name: String,
    pub capacity: u32,
}

impl NewShowing {
    pub fn into_showing(self) -> Showing {
        Showing {
            id: Uuid::new_v4(),
            movie_name: self.movie_name,
            theatre_name: self.theatre_name,
            capacity: self.capacity,
            created_at: Utc::now(),
        }
    }
}
