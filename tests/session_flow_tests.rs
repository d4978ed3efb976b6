// End-to-end tests: wizard -> HTTP server -> real thinkgym-engine

mod session_flow_tests {
    use thinkgym_lib::config::ThinkGymConfig;
    use thinkgym_lib::server::{build_router, ServerAppState};
    use thinkgym_lib::session::{HttpThinkingApi, WizardError, WizardSession, TOPIC_PRESETS};
    use thinkgym_lib::shutdown::ShutdownState;
    use thinkgym_lib::WizardStep;
    use tokio::net::TcpListener;

    const ENGINE: &str = env!("CARGO_BIN_EXE_thinkgym-engine");

    /// Start a server on an ephemeral port and return its base URL
    async fn start_server(config: ThinkGymConfig) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(ServerAppState::new(config, ShutdownState::new()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn engine_config() -> ThinkGymConfig {
        let mut config = ThinkGymConfig::default();
        config.engine.command = vec![ENGINE.to_string()];
        config
    }

    #[tokio::test]
    async fn test_two_rounds_through_the_server() {
        let base = start_server(engine_config()).await;
        let mut wizard = WizardSession::new(HttpThinkingApi::new(base).unwrap());

        wizard.go_next().await.unwrap();
        assert_eq!(wizard.step(), WizardStep::Debate);
        assert_eq!(wizard.topic(), TOPIC_PRESETS[0]);
        assert_eq!(wizard.debate().len(), 4);

        wizard.go_next().await.unwrap();
        wizard.set_user_note("저는 AI 보조 교사 도입에 찬성합니다. 반복 학습과 즉시 피드백이 강점입니다.");
        wizard.go_next().await.unwrap();
        let structure = wizard.structure().unwrap().clone();
        assert!(structure.reasons.len() >= 2);

        wizard.go_next().await.unwrap();
        assert_eq!(wizard.step(), WizardStep::Report);
        assert!(wizard.report().starts_with("# 📝 ThinkGym 세션 리포트"));
        assert!(wizard.report().contains(TOPIC_PRESETS[0]));

        // Next round starts from the suggested revision
        wizard.go_next().await.unwrap();
        assert_eq!(wizard.round(), 2);
        assert_eq!(wizard.user_note(), structure.next_revision);

        let first_round_debate = {
            let mut fresh = WizardSession::new(HttpThinkingApi::new(wizard.api().base_url()).unwrap());
            fresh.go_next().await.unwrap();
            fresh.debate().to_vec()
        };
        wizard.go_next().await.unwrap();
        assert_eq!(wizard.debate().len(), 4);
        assert_ne!(wizard.debate(), first_round_debate.as_slice());
    }

    #[tokio::test]
    async fn test_engine_failure_surfaces_in_wizard() {
        let mut config = engine_config();
        config.engine.mock = false;
        let base = start_server(config).await;
        let mut wizard = WizardSession::new(HttpThinkingApi::new(base).unwrap());

        let err = wizard.go_next().await.unwrap_err();
        match &err {
            WizardError::Api { status, code, .. } => {
                assert_eq!(*status, 501);
                assert_eq!(code.as_deref(), Some("NOT_IMPLEMENTED"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(wizard.step(), WizardStep::Topic);
        assert_eq!(
            wizard.error_message(),
            "Non-mock (LLM) mode is not implemented yet. Use --mock."
        );
    }
}
