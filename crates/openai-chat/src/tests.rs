/// HTTP-level tests against a local mock server.
#[cfg(test)]
mod http {
    use crate::{ChatClient, ChatError, ClientOptions};
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn client(server: &Server) -> ChatClient {
        ChatClient::new(
            "sk-test",
            ClientOptions {
                api_base: server.url(),
                timeout: Duration::from_secs(5),
                organization: None,
            },
        )
        .unwrap()
    }

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        })
        .to_string()
    }

    #[test]
    fn complete_sends_system_and_user_messages() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "be terse" },
                    { "role": "user", "content": "say hi" }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("hi"))
            .expect(1)
            .create();

        let text = client(&server).complete("gpt-4o", "be terse", "say hi").unwrap();
        assert_eq!(text, "hi");
        mock.assert();
    }

    #[test]
    fn organization_header_is_sent_when_configured() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("openai-organization", "org-42")
            .with_status(200)
            .with_body(completion_body("ok"))
            .create();

        let client = ChatClient::new(
            "sk-test",
            ClientOptions {
                api_base: format!("{}/", server.url()),
                timeout: Duration::from_secs(5),
                organization: Some("org-42".into()),
            },
        )
        .unwrap();
        assert_eq!(client.complete("gpt-4o", "s", "u").unwrap(), "ok");
        mock.assert();
    }

    #[test]
    fn rate_limit_is_reported_with_api_message() {
        let mut server = Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "Slow down", "type": "requests"}}"#)
            .create();

        let err = client(&server).complete("gpt-4o", "s", "u").unwrap_err();
        assert!(matches!(err, ChatError::RateLimited(ref m) if m == "Slow down"));
        assert!(err.is_transient());
    }

    #[test]
    fn client_error_status_is_not_transient() {
        let mut server = Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
            .create();

        let err = client(&server).complete("gpt-4o", "s", "u").unwrap_err();
        match &err {
            ChatError::Status { status, message } => {
                assert_eq!(*status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected: {other}"),
        }
        assert!(!err.is_transient());
    }

    #[test]
    fn server_error_with_plain_body() {
        let mut server = Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream overloaded")
            .create();

        let err = client(&server).complete("gpt-4o", "s", "u").unwrap_err();
        assert!(matches!(err, ChatError::Status { status: 503, ref message } if message == "upstream overloaded"));
        assert!(err.is_transient());
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let mut server = Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create();

        let err = client(&server).complete("gpt-4o", "s", "u").unwrap_err();
        assert!(matches!(err, ChatError::Decode { .. }));
    }

    #[test]
    fn empty_choices_or_null_content_is_empty_response() {
        let mut server = Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create();
        let err = client(&server).complete("gpt-4o", "s", "u").unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse));

        let mut server = Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
            .create();
        let err = client(&server).complete("gpt-4o", "s", "u").unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse));
    }

    #[test]
    fn unreachable_server_is_a_connection_error() {
        let client = ChatClient::new(
            "sk-test",
            ClientOptions {
                api_base: "http://127.0.0.1:1".into(),
                timeout: Duration::from_secs(5),
                organization: None,
            },
        )
        .unwrap();
        let err = client.complete("gpt-4o", "s", "u").unwrap_err();
        assert!(matches!(err, ChatError::Connection { .. } | ChatError::Timeout(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn silent_server_hits_the_request_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept, then never answer.
        let holder = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(3));
            drop(stream);
        });

        let client = ChatClient::new(
            "sk-test",
            ClientOptions {
                api_base: format!("http://{addr}"),
                timeout: Duration::from_secs(1),
                organization: None,
            },
        )
        .unwrap();
        let started = std::time::Instant::now();
        let err = client.complete("gpt-4o", "s", "u").unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(
            matches!(err, ChatError::Timeout(t) if t == Duration::from_secs(1)),
            "{err:?}"
        );
        assert!(err.is_transient());
        holder.join().unwrap();
    }

    #[test]
    fn rejects_empty_key_and_zero_timeout() {
        assert!(matches!(
            ChatClient::new(" ", ClientOptions::default()),
            Err(ChatError::Config(_))
        ));
        assert!(matches!(
            ChatClient::new(
                "sk",
                ClientOptions {
                    timeout: Duration::ZERO,
                    ..Default::default()
                }
            ),
            Err(ChatError::Config(_))
        ));
    }
}

/// Deserialization of representative response payloads.
#[cfg(test)]
mod unit {
    use crate::types::{ChatCompletion, ChatRequest, Role};

    #[test]
    fn request_serializes_roles_lowercase() {
        let req = ChatRequest::new("gpt-4o", "sys", "usr");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn parse_completion_with_unknown_fields_and_role() {
        let json = r#"{
            "id": "chatcmpl-9",
            "object": "chat.completion",
            "created": 1700000000,
            "system_fingerprint": "fp_1",
            "choices": [{
                "index": 0,
                "message": { "role": "developer", "content": "  {\"a\": 1}  ", "refusal": null },
                "logprobs": null,
                "finish_reason": "stop"
            }]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(completion.choices[0].message.role, Role::Other);
        assert_eq!(completion.first_text(), Some("  {\"a\": 1}  "));
        assert!(completion.usage.is_none());
    }

    #[test]
    fn whitespace_only_content_counts_as_empty() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "  \n"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(completion.first_text(), None);
    }
}
