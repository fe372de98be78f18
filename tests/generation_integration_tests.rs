//! Integration tests for the chat-completions client
//!
//! wiremock stands in for the generation service.

use std::time::Duration;

use ragnarok::client::{GenerationClient, OpenAiClient, RetryPolicy, complete_with_retry};
use ragnarok::config::GenerationConfig;
use ragnarok::db::Database;
use ragnarok::error::ErrorKind;
use ragnarok::exercises::{DayType, Goal, WorkoutRequest};
use ragnarok::{Lab, LabError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS: &str = "/v1/chat/completions";

fn test_config(server: &MockServer) -> GenerationConfig {
    let mut cfg = GenerationConfig::new("sk-test");
    cfg.base_url = server.uri();
    cfg
}

fn test_client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(&test_config(server)).expect("client config is valid")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

fn instant_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_jitter: Duration::ZERO,
    }
}

mod completion_tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_trimmed_completion_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_string_contains("\"model\":\"gpt-4o\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("\n  [] \n")))
            .expect(1)
            .mount(&server)
            .await;

        let text = test_client(&server).complete("give me a workout").await.unwrap();
        assert_eq!(text, "[]");
    }

    #[tokio::test]
    async fn test_sends_prompt_as_single_user_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        test_client(&server).complete("hello lab").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello lab");
        assert_eq!(body["temperature"], 0.5);
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = test_client(&server).complete("p").await.unwrap_err();
        assert!(matches!(err, LabError::MalformedResponse(_)));
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(err.user_hint().contains("Regenerate"));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_non_json_envelope_is_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = test_client(&server).complete("p").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}

mod status_mapping_tests {
    use super::*;

    async fn fail_with(status: u16) -> LabError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(status).set_body_string("{\"error\":\"nope\"}"))
            .mount(&server)
            .await;
        test_client(&server).complete("p").await.unwrap_err()
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error() {
        let err = fail_with(401).await;
        assert!(matches!(err, LabError::Auth(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_too_many_requests_is_rate_limited() {
        let err = fail_with(429).await;
        assert!(matches!(err, LabError::RateLimited));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let err = fail_with(500).await;
        match &err {
            LabError::Api { status, message } => {
                assert_eq!(*status, 500);
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("[]"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut cfg = test_config(&server);
        cfg.timeout_secs = 1;
        let client = OpenAiClient::new(&cfg).unwrap();

        let err = client.complete("p").await.unwrap_err();
        assert!(matches!(err, LabError::Timeout(1)));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}

mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_retries_past_transient_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("[]")))
            .mount(&server)
            .await;

        let text = complete_with_retry(&test_client(&server), "p", &instant_retry(2))
            .await
            .unwrap();
        assert_eq!(text, "[]");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = complete_with_retry(&test_client(&server), "p", &instant_retry(3))
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Auth(_)));
    }
}

mod lab_tests {
    use super::*;

    const WORKOUT: &str = r#"```json
{
  "warm_up": "5 min row, band pull-aparts",
  "exercises": [
    {"exercise": "Barbell Row", "muscle": "Back", "target_detail": "Lats", "sets": "4", "reps": 8, "weight": "Auto"},
    {"exercise": "Face Pull", "muscle": "Shoulders", "sets": 3, "reps": "15", "superset_group_id": 2},
    {"exercise": "Hammer Curl", "muscle": "Biceps", "sets": 3, "reps": "12", "superset_group_id": 2}
  ],
  "finisher": "Dead hang to failure"
}
```"#;

    #[tokio::test]
    async fn test_generate_and_log_against_mock_service() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .and(body_string_contains("PULL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(WORKOUT)))
            .expect(1)
            .mount(&server)
            .await;

        let lab = Lab::new(test_client(&server), Database::open(":memory:").unwrap());
        let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let req = lab.build_request(DayType::Pull, Goal::Strength, date, 3).await.unwrap();

        let workout = lab.generate(&req).await.unwrap();
        assert_eq!(workout.warm_up.as_deref(), Some("5 min row, band pull-aparts"));
        assert_eq!(workout.finisher.as_deref(), Some("Dead hang to failure"));

        let notes = vec!["weight=70; rpe=8".to_string()];
        let rows = lab.log_workout(&req, &workout, &notes).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].workout_id, "20240604-Pull");
        assert_eq!(rows[0].sets, 4);
        assert_eq!(rows[0].reps, "8");
        assert_eq!(rows[0].notes, "weight=70; rpe=8");
        assert_eq!(rows[1].superset_group_id, 2);
        assert_eq!(rows[1].weight, "Auto");
        assert_eq!(rows[2].notes, "");

        let stored = lab.book().sink().get_rows().unwrap();
        assert_eq!(stored, rows);
    }

    #[tokio::test]
    async fn test_rate_limited_generation_writes_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let lab = Lab::new(test_client(&server), Database::open(":memory:").unwrap());
        let req = WorkoutRequest::new(
            DayType::Legs,
            Goal::Hypertrophy,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
        );

        let err = lab.generate(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(lab.book().sink().get_rows().unwrap().is_empty());
    }
}
