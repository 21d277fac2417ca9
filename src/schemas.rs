use serde_json::{Map, Value, json};
use std::sync::Arc;

fn to_map(schema: Value) -> Arc<Map<String, Value>> {
    Arc::new(schema.as_object().cloned().unwrap_or_else(Map::new))
}

pub fn get_initial_challenge_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "context": {"type": "string", "description": "AI usage context, e.g. Personal, Education, Professional"}
        },
        "required": ["context"]
    }))
}

pub fn submit_and_get_next_challenge_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "context": {"type": "string"},
            "currentDifficulty": {"type": "integer", "minimum": 1, "maximum": 10},
            "userPerformance": {"type": "integer", "minimum": 1, "maximum": 10},
            "challengeType": {"type": "string", "default": "reasoning"}
        },
        "required": ["context", "currentDifficulty", "userPerformance"]
    }))
}

fn behavioral_sample() -> Value {
    json!({
        "type": "object",
        "properties": {
            "timeSpent": {"type": "number", "minimum": 0},
            "hesitation": {"type": "number", "minimum": 0}
        },
        "required": ["timeSpent", "hesitation"]
    })
}

pub fn generate_report_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "responses": {"type": "array", "items": {"type": "string"}},
            "behavioralData": {
                "oneOf": [
                    behavioral_sample(),
                    {"type": "array", "items": behavioral_sample()}
                ]
            },
            "context": {"type": "string"},
            "userId": {"type": "string", "description": "Persist the session for this user when set"},
            "startTime": {"type": "string", "format": "date-time"}
        },
        "required": ["responses", "behavioralData", "context"]
    }))
}

pub fn assessment_start_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "userId": {"type": "string"},
            "context": {"type": "string"}
        },
        "required": ["userId", "context"]
    }))
}

pub fn assessment_respond_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "runId": {"type": "string", "format": "uuid"},
            "response": {"type": "string"},
            "timeSpentMs": {"type": "integer", "minimum": 0},
            "firstInteractionMs": {"type": "integer", "minimum": 0}
        },
        "required": ["runId", "response", "timeSpentMs"]
    }))
}

pub fn run_id_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "runId": {"type": "string", "format": "uuid"}
        },
        "required": ["runId"]
    }))
}

pub fn register_user_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "email": {"type": "string"},
            "username": {"type": "string"},
            "onboardingContext": {"type": "string"},
            "isAdmin": {"type": "boolean", "default": false}
        },
        "required": ["email"]
    }))
}

pub fn user_id_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "userId": {"type": "string"}
        },
        "required": ["userId"]
    }))
}

pub fn list_users_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "requesterId": {"type": "string", "description": "Must belong to an admin user"}
        },
        "required": ["requesterId"]
    }))
}

/// Shape of a single challenge in tool output
pub fn challenge_output_schema() -> Arc<Map<String, Value>> {
    to_map(json!({
        "type": "object",
        "properties": {
            "success": {"type": "boolean"},
            "error": {"type": "string"},
            "challenge": {
                "type": "object",
                "properties": {
                    "challengeText": {"type": "string"},
                    "challengeType": {"type": "string", "enum": ["open", "multipleChoice"]},
                    "options": {"type": "array", "items": {"type": "string"}, "minItems": 3, "maxItems": 4},
                    "source": {"type": "string", "enum": ["generated", "fallback"]}
                },
                "required": ["challengeText", "challengeType"]
            }
        },
        "required": ["success"]
    }))
}
