// Wire types exchanged with the draft backend, and the endpoint paths.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Endpoint paths
// ---------------------------------------------------------------------------

pub mod paths {
    /// Resolve the identity behind a bearer token.
    pub const RESOLVE_IDENTITY: &str = "users/token";
    pub const LOGIN: &str = "users/login";
    pub const REGISTER: &str = "users/register";
    pub const DRAFTS: &str = "drafts";

    pub fn choices(draft_id: i64) -> String {
        format!("drafts/{draft_id}/choices")
    }

    pub fn playthroughs(draft_id: i64) -> String {
        format!("drafts/{draft_id}/playthroughs")
    }

    pub fn save(draft_id: i64) -> String {
        format!("drafts/{draft_id}/save")
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Server-side record for the logged-in player. Only `login` is interpreted;
/// every other field is kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub login: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body posted to the login and register endpoints.
#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub login: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub slug: String,
}

/// One card offered at a given turn of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub turn_number: u32,
    #[serde(default)]
    pub option_number: u32,
    pub card: Card,
}

/// A card the user took at a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub turn_number: u32,
    #[serde(alias = "picked_card_id")]
    pub card_id: i64,
}

/// A recorded run through a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playthrough {
    pub id: i64,
    /// Login of the player who recorded the run, when the server includes it.
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default, alias = "draft_picks")]
    pub picks: Vec<Pick>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoicesResponse {
    #[serde(default)]
    pub cards: Vec<Choice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaythroughsResponse {
    #[serde(default)]
    pub playthroughs: Vec<Playthrough>,
}

/// The draft listing arrives either wrapped (`{"drafts": [...]}`) or bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DraftList {
    Wrapped { drafts: Vec<DraftSummary> },
    Bare(Vec<DraftSummary>),
}

impl DraftList {
    pub fn into_vec(self) -> Vec<DraftSummary> {
        match self {
            DraftList::Wrapped { drafts } => drafts,
            DraftList::Bare(drafts) => drafts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavePlaythrough<'a> {
    pub picks: &'a [Pick],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_keeps_unknown_fields() {
        let user: UserIdentity =
            serde_json::from_value(json!({"login": "alice", "id": 7, "virtual": false})).unwrap();
        assert_eq!(user.login, "alice");
        assert_eq!(user.extra.get("id"), Some(&json!(7)));
        assert_eq!(user.extra.get("virtual"), Some(&json!(false)));
    }

    #[test]
    fn choices_response_parses_nested_cards() {
        let body = json!({
            "cards": [
                {"turn_number": 1, "option_number": 2,
                 "card": {"id": 10, "name": "Lightning Bolt", "image": "bolt.png", "slug": "bolt"}}
            ]
        });
        let parsed: ChoicesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.cards.len(), 1);
        assert_eq!(parsed.cards[0].card.name, "Lightning Bolt");
        assert_eq!(parsed.cards[0].option_number, 2);
    }

    #[test]
    fn missing_slices_default_to_empty() {
        let choices: ChoicesResponse = serde_json::from_value(json!({})).unwrap();
        let plays: PlaythroughsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(choices.cards.is_empty());
        assert!(plays.playthroughs.is_empty());
    }

    #[test]
    fn playthrough_accepts_backend_pick_field_names() {
        let body = json!({
            "id": 3,
            "draft_picks": [{"turn_number": 1, "picked_card_id": 42}]
        });
        let play: Playthrough = serde_json::from_value(body).unwrap();
        assert_eq!(play.picks, vec![Pick { turn_number: 1, card_id: 42 }]);
        assert_eq!(play.player, None);
    }

    #[test]
    fn draft_list_accepts_wrapped_and_bare_forms() {
        let wrapped: DraftList =
            serde_json::from_value(json!({"drafts": [{"id": 1}, {"id": 2}]})).unwrap();
        let bare: DraftList =
            serde_json::from_value(json!([{"id": 5, "created_at": "2024-03-01T10:00:00"}])).unwrap();
        assert_eq!(wrapped.into_vec().len(), 2);
        let bare = bare.into_vec();
        assert_eq!(bare[0].id, 5);
        assert!(bare[0].created_at.is_some());
    }

    #[test]
    fn paths_embed_draft_id() {
        assert_eq!(paths::choices(5), "drafts/5/choices");
        assert_eq!(paths::playthroughs(5), "drafts/5/playthroughs");
        assert_eq!(paths::save(12), "drafts/12/save");
    }

    #[test]
    fn token_response_tolerates_null_token() {
        let parsed: TokenResponse = serde_json::from_value(json!({"token": null})).unwrap();
        assert_eq!(parsed.token, None);
    }
}
