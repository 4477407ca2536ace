use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirpy_core::{ChirpId, DomainError, DomainResult, Entity, Owned, UserId};

/// Longest accepted chirp body, in characters.
pub const MAX_CHIRP_LENGTH: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    pub id: ChirpId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: UserId,
}

impl Entity for Chirp {
    type Id = ChirpId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Chirp {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

/// A validated chirp body: non-blank, at most [`MAX_CHIRP_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChirpBody(String);

impl ChirpBody {
    pub fn parse(body: impl Into<String>) -> DomainResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation("chirp is empty"));
        }
        if body.chars().count() > MAX_CHIRP_LENGTH {
            return Err(DomainError::validation("chirp is too long"));
        }
        Ok(Self(body))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Input to [`crate::store::ChirpStore::create_chirp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChirp {
    pub body: ChirpBody,
    pub user_id: UserId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(DomainError::validation(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Listing options: optional author filter, ordered by `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListChirps {
    pub author_id: Option<UserId>,
    pub sort: SortOrder,
}

/// Filter and order chirps in place. Ties on `created_at` fall back to id.
pub fn sort_chirps(chirps: &mut Vec<Chirp>, opts: &ListChirps) {
    if let Some(author) = opts.author_id {
        chirps.retain(|c| c.user_id == author);
    }
    chirps.sort_by(|a, b| (a.created_at, a.id.as_uuid()).cmp(&(b.created_at, b.id.as_uuid())));
    if opts.sort == SortOrder::Desc {
        chirps.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn chirp(user_id: UserId, at: DateTime<Utc>) -> Chirp {
        Chirp {
            id: ChirpId::new(),
            created_at: at,
            updated_at: at,
            body: "I'm the one who knocks!".to_string(),
            user_id,
        }
    }

    #[test]
    fn body_limits() {
        assert!(ChirpBody::parse("x".repeat(MAX_CHIRP_LENGTH)).is_ok());
        assert_eq!(
            ChirpBody::parse("x".repeat(MAX_CHIRP_LENGTH + 1)).unwrap_err(),
            DomainError::validation("chirp is too long")
        );
        assert_eq!(
            ChirpBody::parse("  ").unwrap_err(),
            DomainError::validation("chirp is empty")
        );
    }

    #[test]
    fn length_counts_characters() {
        // 140 two-byte characters.
        assert!(ChirpBody::parse("é".repeat(MAX_CHIRP_LENGTH)).is_ok());
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!(matches!("sideways".parse::<SortOrder>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn chirps_are_owned_by_their_author() {
        let author = UserId::new();
        assert_eq!(chirp(author, Utc::now()).owner(), author);
    }

    #[test]
    fn listing_filters_by_author_and_orders() {
        let (a, b) = (UserId::new(), UserId::new());
        let t = Utc::now();
        let mut all = vec![
            chirp(a, t + Duration::seconds(2)),
            chirp(b, t + Duration::seconds(1)),
            chirp(a, t),
        ];

        let mut mine = all.clone();
        sort_chirps(&mut mine, &ListChirps { author_id: Some(a), sort: SortOrder::Desc });
        assert_eq!(mine.len(), 2);
        assert!(mine[0].created_at > mine[1].created_at);

        sort_chirps(&mut all, &ListChirps::default());
        assert_eq!(all[0].created_at, t);
        assert_eq!(all[2].created_at, t + Duration::seconds(2));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn accepted_bodies_respect_the_limit(body in "\\PC{0,200}") {
            match ChirpBody::parse(body.clone()) {
                Ok(parsed) => {
                    prop_assert!(parsed.as_str().chars().count() <= MAX_CHIRP_LENGTH);
                    prop_assert!(!parsed.as_str().trim().is_empty());
                }
                Err(_) => prop_assert!(
                    body.trim().is_empty() || body.chars().count() > MAX_CHIRP_LENGTH
                ),
            }
        }
    }
}
