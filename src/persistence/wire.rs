// JSON bodies of the points / tickets API.

use serde::{Deserialize, Serialize};

use super::{LeaderboardEntry, UserRecord, Wallet};
use crate::error::PersistenceError;

#[derive(Debug, Serialize)]
pub struct UpdateTicketsRequest<'a> {
    pub username: &'a str,
    pub tickets: u32,
}

#[derive(Debug, Serialize)]
pub struct SaveUserRequest<'a> {
    pub username: &'a str,
    pub points: u32,
}

#[derive(Debug, Deserialize)]
struct UserDataResponse {
    success: bool,
    #[serde(default)]
    points: Option<u64>,
    #[serde(default)]
    tickets: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    success: bool,
    #[serde(default)]
    data: Option<UserRecord>,
    #[serde(default)]
    error: Option<String>,
}

fn rejected(error: Option<String>) -> PersistenceError {
    PersistenceError::Rejected(error.unwrap_or_else(|| "unknown error".to_string()))
}

/// `GET /getUserData` body.
pub fn decode_user_data(body: &str) -> Result<Wallet, PersistenceError> {
    let resp: UserDataResponse = serde_json::from_str(body)?;
    match resp {
        UserDataResponse {
            success: true,
            points: Some(points),
            tickets: Some(tickets),
            ..
        } => Ok(Wallet { points, tickets }),
        UserDataResponse { success: true, .. } => Err(rejected(Some("incomplete user data".to_string()))),
        UserDataResponse { error, .. } => Err(rejected(error)),
    }
}

/// `POST /updateTickets` and `POST /saveUser` bodies.
pub fn decode_record(body: &str) -> Result<UserRecord, PersistenceError> {
    let resp: RecordResponse = serde_json::from_str(body)?;
    match (resp.success, resp.data) {
        (true, Some(record)) => Ok(record),
        (true, None) => Err(rejected(Some("missing data".to_string()))),
        (false, _) => Err(rejected(resp.error)),
    }
}

/// `GET /topUsers` body.
pub fn decode_top_users(body: &str) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data() {
        let wallet = decode_user_data(r#"{"success":true,"points":12,"tickets":99}"#).unwrap();
        assert_eq!(wallet, Wallet { points: 12, tickets: 99 });
        let err = decode_user_data(r#"{"success":false,"error":"boom"}"#).unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected(msg) if msg == "boom"));
        assert!(matches!(decode_user_data("<html>"), Err(PersistenceError::Decode(_))));
    }

    #[test]
    fn test_saved_record_keeps_server_columns() {
        let body = r#"{"success":true,"data":{"id":3,"username":"ana","points":41,"tickets":97,"max_score":57}}"#;
        let record = decode_record(body).unwrap();
        assert_eq!(record.points, 41);
        assert_eq!(record.max_score, Some(57));
        assert_eq!(record.tickets, Some(97));
        assert!(decode_record(r#"{"success":false,"error":"User not found"}"#).is_err());
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_string(&UpdateTicketsRequest { username: "ana", tickets: 4 }).unwrap();
        assert_eq!(body, r#"{"username":"ana","tickets":4}"#);
        let body = serde_json::to_string(&SaveUserRequest { username: "ana", points: 9 }).unwrap();
        assert_eq!(body, r#"{"username":"ana","points":9}"#);
    }

    #[test]
    fn test_top_users() {
        let rows = decode_top_users(r#"[{"username":"a","points":9},{"username":"b","points":3}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "a");
    }
}
