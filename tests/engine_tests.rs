// Integration tests for the thinkgym-engine binary
// Runs the built binary directly and through the server's invoker

mod engine_tests {
    use serde_json::{json, Value};
    use std::process::Command;
    use std::time::Duration;
    use thinkgym_lib::engine::{invoke, normalize, InvocationRequest, ResultEnvelope};

    const ENGINE: &str = env!("CARGO_BIN_EXE_thinkgym-engine");

    fn run(args: &[&str]) -> (i32, Value, String) {
        let output = Command::new(ENGINE).args(args).output().unwrap();
        let stdout = String::from_utf8(output.stdout).unwrap();
        let doc: Value = serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("stdout is not one JSON document ({}): {}", e, stdout));
        (
            output.status.code().unwrap_or(-1),
            doc,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
    }

    fn debate_json() -> String {
        let (_, doc, _) = run(&["--mode", "debate", "--topic", "주제", "--mock"]);
        doc["debate"].to_string()
    }

    #[test]
    fn test_debate_mode() {
        let (code, doc, _) = run(&["--mode", "debate", "--topic", "원격근무", "--mock"]);
        assert_eq!(code, 0);
        assert_eq!(doc["ok"], true);
        assert_eq!(doc["mode"], "debate");
        assert_eq!(doc["topic"], "원격근무");
        assert_eq!(doc["round"], 1);
        assert_eq!(doc["meta"], json!({"mock": true, "seed": 42}));

        let roles: Vec<&str> = doc["debate"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["pro", "con", "pro", "con"]);
    }

    #[test]
    fn test_same_seed_and_round_is_deterministic() {
        let args = ["--mode", "full", "--topic", "t", "--seed", "9", "--round", "3", "--mock"];
        let (_, first, _) = run(&args);
        let (_, second, _) = run(&args);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_mock_flag_is_not_implemented() {
        let (code, doc, _) = run(&["--mode", "debate", "--topic", "t"]);
        assert_eq!(code, 1);
        assert_eq!(doc["ok"], false);
        assert_eq!(doc["error"]["code"], "NOT_IMPLEMENTED");
        assert_eq!(doc["error"]["http_hint"], 501);
    }

    #[test]
    fn test_invalid_round_and_blank_topic() {
        let (code, doc, _) = run(&["--mode", "debate", "--topic", "t", "--round", "0", "--mock"]);
        assert_eq!(code, 1);
        assert_eq!(doc["error"]["message"], "round must be >= 1");

        let (code, doc, _) = run(&["--mode", "debate", "--topic", "  ", "--mock"]);
        assert_eq!(code, 1);
        assert_eq!(doc["error"]["code"], "INVALID_INPUT");
        assert_eq!(doc["error"]["http_hint"], 400);
    }

    #[test]
    fn test_unknown_mode_still_writes_json() {
        let (code, doc, _) = run(&["--mode", "summary", "--topic", "t", "--mock"]);
        assert_eq!(code, 1);
        assert_eq!(doc["ok"], false);
        assert_eq!(doc["error"]["code"], "INVALID_INPUT");
    }

    #[test]
    fn test_structure_and_report_modes() {
        let debate = debate_json();
        let note = "저는 조건부 도입이 필요하다고 봅니다. 검증 지표와 책임 주체가 먼저 정해져야 합니다.";
        let (code, doc, _) = run(&[
            "--mode", "structure", "--topic", "주제", "--debate-json", &debate,
            "--user-note", note, "--mock",
        ]);
        assert_eq!(code, 0);
        let structure = doc["structure"].clone();
        assert!(structure["reasons"].as_array().unwrap().len() >= 2);

        let structure_json = structure.to_string();
        let (code, doc, _) = run(&[
            "--mode", "report", "--topic", "주제", "--debate-json", &debate,
            "--structure-json", &structure_json, "--user-note", note, "--mock",
        ]);
        assert_eq!(code, 0);
        assert_eq!(doc["meta"]["structure_source"], "input");
        let report = doc["report"].as_str().unwrap();
        assert!(report.contains("## 5. 다음 라운드 추천 질문"));
        assert!(report.contains(structure["assumptions"][0].as_str().unwrap()));
    }

    #[test]
    fn test_report_without_debate_is_invalid() {
        let (code, doc, _) = run(&["--mode", "report", "--topic", "t", "--mock"]);
        assert_eq!(code, 1);
        assert_eq!(
            doc["error"]["message"],
            "debate_json is required for structure/report mode"
        );
    }

    #[tokio::test]
    async fn test_invoker_and_normalizer_with_real_engine() {
        let request = InvocationRequest::new(vec![
            ENGINE.to_string(),
            "--mode".to_string(),
            "debate".to_string(),
            "--topic".to_string(),
            "t".to_string(),
            "--mock".to_string(),
        ])
        .with_timeout(Duration::from_secs(10));

        let outcome = invoke(&request).await;
        assert_eq!(outcome.exit_code(), 0);
        match normalize(&outcome) {
            ResultEnvelope::Success { payload, exit_code } => {
                assert_eq!(exit_code, 0);
                assert_eq!(payload["debate"].as_array().unwrap().len(), 4);
                assert!(payload.get("_stderr").is_some());
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_engine_error_keeps_http_hint() {
        let request = InvocationRequest::new(vec![
            ENGINE.to_string(),
            "--mode".to_string(),
            "debate".to_string(),
            "--topic".to_string(),
            "t".to_string(),
        ]);
        let outcome = invoke(&request).await;
        match normalize(&outcome) {
            ResultEnvelope::Failure { error, exit_code } => {
                assert_eq!(exit_code, 1);
                assert_eq!(error.code, "NOT_IMPLEMENTED");
                assert_eq!(error.engine_http_hint(), Some(501));
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }
}
