use serde_json::{Map, Value};

use crate::error::ActionError;
use crate::logic::PermissionEngine;
use crate::model::{project, Collection, Filter, Id, Operator, Permission, Record, UserScope};
use crate::store::Transaction;

const SEARCH_FIELDS: [&str; 4] = ["username", "email", "first_name", "last_name"];
const RESULT_FIELDS: [&str; 5] = ["id", "username", "first_name", "last_name", "email"];

/// A validated `search_users` request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchUsersRequest {
    pub permission_type: UserScope,
    pub permission_id: Id,
    pub search: Vec<Map<String, Value>>,
}

impl SearchUsersRequest {
    pub fn parse(data: &Value) -> Result<Self, ActionError> {
        let data = data
            .as_object()
            .ok_or_else(|| ActionError::action("data must be object"))?;
        let permission_type = data
            .get("permission_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse::<UserScope>()
            .map_err(ActionError::Action)?;
        let permission_id = match data.get("permission_id").and_then(Value::as_i64) {
            Some(id) if id >= 1 => id as Id,
            Some(_) => {
                return Err(ActionError::action(
                    "data.permission_id must be bigger than or equal to 1",
                ))
            }
            None => return Err(ActionError::action("data.permission_id must be integer")),
        };
        let search = match data.get("search") {
            Some(Value::Array(sets)) => sets
                .iter()
                .map(|set| {
                    set.as_object()
                        .cloned()
                        .ok_or_else(|| ActionError::action("data.search must contain only objects"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(ActionError::action("data.search must be array")),
        };
        Ok(Self {
            permission_type,
            permission_id,
            search,
        })
    }
}

fn normalized(set: &Map<String, Value>, field: &str) -> String {
    set.get(field)
        .and_then(Value::as_str)
        .map(|value| value.trim().to_lowercase())
        .unwrap_or_default()
}

/// Build the filter of one search set. A username alone identifies a user;
/// without one, email and both names are all needed. Anything less matches
/// nobody.
pub fn search_filter(set: &Map<String, Value>) -> Option<Filter> {
    let [username, email, first_name, last_name] =
        SEARCH_FIELDS.map(|field| normalized(set, field));
    if !username.is_empty() {
        return Some(Filter::and(vec![Filter::op(
            "username",
            Operator::ILike,
            username,
        )]));
    }
    if email.is_empty() || first_name.is_empty() || last_name.is_empty() {
        return None;
    }
    Some(Filter::and(vec![
        Filter::op("email", Operator::ILike, email),
        Filter::op("first_name", Operator::ILike, first_name),
        Filter::op("last_name", Operator::ILike, last_name),
    ]))
}

/// Find users by username or by email and full name. Returns one result
/// list per search set, in request order. Equal search sets share a single
/// datastore query.
pub async fn search_users(
    tx: &mut Transaction,
    user_id: Id,
    data: &Value,
) -> Result<Value, ActionError> {
    let request = SearchUsersRequest::parse(data)?;
    PermissionEngine::check_scope(
        tx,
        user_id,
        request.permission_type,
        request.permission_id,
        Permission::UserCanManage,
    )
    .await?;

    let filters: Vec<Option<Filter>> = request.search.iter().map(search_filter).collect();
    let combined = Filter::or_distinct(filters.iter().flatten().cloned());
    let users: Vec<Record> = match &combined {
        Filter::Or { or_filter } if or_filter.is_empty() => Vec::new(),
        _ => tx
            .filter(Collection::User, &combined, &[], false)
            .await?
            .into_values()
            .collect(),
    };
    log::debug!(
        "search_users: {} sets, {} distinct queries, {} candidates",
        filters.len(),
        match &combined {
            Filter::Or { or_filter } => or_filter.len(),
            _ => 1,
        },
        users.len()
    );

    let results = filters
        .iter()
        .map(|filter| {
            let matches = filter.as_ref().map_or_else(Vec::new, |filter| {
                users
                    .iter()
                    .filter(|user| filter.matches(user))
                    .map(|user| Value::Object(project(user, &RESULT_FIELDS)))
                    .collect()
            });
            Value::Array(matches)
        })
        .collect();
    Ok(Value::Array(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_username_takes_precedence() {
        let filter = search_filter(&set(json!({
            "username": " USER2",
            "email": "user4@test.de",
            "first_name": "first4",
            "last_name": "last4",
        })));
        assert_eq!(
            filter,
            Some(Filter::and(vec![Filter::op("username", Operator::ILike, "user2")]))
        );
    }

    #[test]
    fn test_incomplete_sets_match_nothing() {
        assert_eq!(search_filter(&set(json!({"email": "userX@test.de"}))), None);
        assert_eq!(
            search_filter(&set(json!({
                "username": "",
                "email": "",
                "first_name": "",
                "last_name": "",
            }))),
            None
        );
        assert_eq!(
            search_filter(&set(json!({"email": "a@b.de", "first_name": "", "last_name": "x"}))),
            None
        );
    }

    #[test]
    fn test_request_validation() {
        let error = SearchUsersRequest::parse(&json!({
            "permission_type": "user",
            "permission_id": 1,
            "search": [],
        }))
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "data.permission_type must be one of ['meeting', 'committee', 'organization']"
        );

        let error = SearchUsersRequest::parse(&json!({
            "permission_type": "organization",
            "permission_id": 0,
            "search": [],
        }))
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "data.permission_id must be bigger than or equal to 1"
        );
    }
}
