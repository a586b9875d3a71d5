use gumcp_agent::sandbox::{
    Execution, ExecutionError, SandboxBackend, SandboxConfig, SandboxError, SandboxHandle,
    SandboxManager, SandboxRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    RunFails,
    InstallFails,
    Hangs,
}

struct CountingBackend {
    behavior: Behavior,
    created: AtomicUsize,
    runs: AtomicUsize,
    killed: AtomicUsize,
}

impl CountingBackend {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            created: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            killed: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl SandboxBackend for CountingBackend {
    async fn create(&self, request: &SandboxRequest) -> Result<SandboxHandle, SandboxError> {
        assert_eq!(request.timeout_secs, 3600);
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(SandboxHandle {
            sandbox_id: format!("sbx-{n}"),
            access_token: Some("token".to_string()),
        })
    }

    async fn run_code(
        &self,
        _handle: &SandboxHandle,
        code: &str,
    ) -> Result<Execution, SandboxError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let installing = code.contains("pip");
        match self.behavior {
            Behavior::Succeed => {
                let mut execution = Execution::default();
                execution.logs.stdout.push("ok\n".to_string());
                execution.finished = true;
                Ok(execution)
            }
            Behavior::RunFails => Err(SandboxError::Network("connection reset".to_string())),
            Behavior::InstallFails if installing => Ok(Execution {
                error: Some(ExecutionError {
                    name: "CalledProcessError".to_string(),
                    value: "pip failed".to_string(),
                    traceback: String::new(),
                }),
                ..Execution::default()
            }),
            Behavior::InstallFails => Ok(Execution::default()),
            Behavior::Hangs => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Execution::default())
            }
        }
    }

    async fn kill(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.killed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn manager(backend: &Arc<CountingBackend>, packages: &[&str]) -> SandboxManager {
    SandboxManager::new(
        backend.clone(),
        SandboxConfig {
            template: "code-interpreter-v1".to_string(),
            timeout_secs: 3600,
            env_vars: vec![
                ("GUMCP_CREDENTIALS".to_string(), "creds".to_string()),
                ("ZAI_API_KEY".to_string(), String::new()),
            ],
            packages: packages.iter().map(ToString::to_string).collect(),
        },
    )
}

#[tokio::test]
async fn test_successful_run_kills_sandbox_once() {
    let backend = CountingBackend::new(Behavior::Succeed);
    let execution = manager(&backend, &[])
        .run_python_code("print('ok')")
        .await
        .expect("run should succeed");

    assert_eq!(execution.to_string(), "Stdout:\nok");
    assert_eq!(backend.created.load(Ordering::SeqCst), 1);
    assert_eq!(backend.killed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_run_still_kills_sandbox() {
    let backend = CountingBackend::new(Behavior::RunFails);
    let result = manager(&backend, &[]).run_python_code("1/0").await;

    assert!(matches!(result, Err(SandboxError::Network(_))));
    assert_eq!(backend.killed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_install_failure_skips_code_and_kills() {
    let backend = CountingBackend::new(Behavior::InstallFails);
    let result = manager(&backend, &["requests"])
        .run_python_code("import requests")
        .await;

    assert!(matches!(result, Err(SandboxError::Install(ref msg)) if msg.contains("pip failed")));
    assert_eq!(backend.runs.load(Ordering::SeqCst), 1);
    assert_eq!(backend.killed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_run_kills_sandbox_on_drop() {
    let backend = CountingBackend::new(Behavior::Hangs);
    let sandbox = manager(&backend, &[]);

    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), sandbox.run_python_code("while True: pass"))
            .await;
    assert!(timed_out.is_err());

    // The kill runs on a spawned task
    for _ in 0..50 {
        if backend.killed.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(backend.created.load(Ordering::SeqCst), 1);
    assert_eq!(backend.killed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_each_call_gets_a_fresh_sandbox() {
    let backend = CountingBackend::new(Behavior::Succeed);
    let sandbox = manager(&backend, &[]);

    for _ in 0..3 {
        sandbox
            .run_python_code("x = 1")
            .await
            .expect("run should succeed");
    }
    assert_eq!(backend.created.load(Ordering::SeqCst), 3);
    assert_eq!(backend.killed.load(Ordering::SeqCst), 3);
}

/// Kill takes long enough for the caller to be cancelled while it is pending
struct SlowKillBackend {
    created: AtomicUsize,
    kills_started: AtomicUsize,
    kills_completed: AtomicUsize,
}

#[async_trait::async_trait]
impl SandboxBackend for SlowKillBackend {
    async fn create(&self, _request: &SandboxRequest) -> Result<SandboxHandle, SandboxError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(SandboxHandle {
            sandbox_id: "sbx-slow".to_string(),
            access_token: None,
        })
    }

    async fn run_code(
        &self,
        _handle: &SandboxHandle,
        _code: &str,
    ) -> Result<Execution, SandboxError> {
        Ok(Execution::default())
    }

    async fn kill(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.kills_started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.kills_completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_release_cancelled_during_kill_still_kills() {
    let backend = Arc::new(SlowKillBackend {
        created: AtomicUsize::new(0),
        kills_started: AtomicUsize::new(0),
        kills_completed: AtomicUsize::new(0),
    });
    let sandbox = SandboxManager::new(
        backend.clone(),
        SandboxConfig {
            template: "code-interpreter-v1".to_string(),
            timeout_secs: 3600,
            env_vars: Vec::new(),
            packages: Vec::new(),
        },
    );

    let timed_out =
        tokio::time::timeout(Duration::from_millis(30), sandbox.run_python_code("print(1)")).await;
    assert!(timed_out.is_err());

    // The interrupted kill is retried from the lease's Drop
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.created.load(Ordering::SeqCst), 1);
    assert_eq!(backend.kills_started.load(Ordering::SeqCst), 2);
    assert_eq!(backend.kills_completed.load(Ordering::SeqCst), 1);
}
