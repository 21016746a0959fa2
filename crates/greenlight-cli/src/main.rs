use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;

use greenlight_core::{
    Barrier, BarrierEvent, BarrierOptions, EventSink, Host, TaskOptions, WillReadyHook,
};

#[derive(Debug, Deserialize)]
struct ServerConfig {
    addr: String,
    workers: usize,
}

/// 受け取ったイベントを stdout に流すだけの sink
struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &BarrierEvent) {
        match event {
            BarrierEvent::Stat(stat) => match serde_json::to_string(stat) {
                Ok(json) => println!("[stat] {json}"),
                Err(e) => eprintln!("[stat] encode failed: {e}"),
            },
            BarrierEvent::Timeout { task } => println!("[timeout] `{task}` is taking long"),
            BarrierEvent::Error(error) => println!("[error] {error}"),
        }
    }
}

struct DemoServer {
    sink: Arc<StdoutSink>,
}

impl Host for DemoServer {
    fn event_sink(&self) -> Option<Arc<dyn EventSink>> {
        Some(self.sink.clone())
    }
}

/// ready 直前に一度だけ走るフック
struct RouteTableHook;

#[async_trait]
impl WillReadyHook for RouteTableHook {
    async fn run(&self) -> Result<(), String> {
        println!("building route table before going ready");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("starting demo server boot");

    // (A) barrier を用意して host に attach
    let options = BarrierOptions::default().timeout(Duration::from_millis(300));
    let barrier = Barrier::with_options(options);
    let server = Arc::new(DemoServer {
        sink: Arc::new(StdoutSink),
    });
    let ready = barrier.attach(server).expect("first attach");

    barrier.will_ready(Arc::new(RouteTableHook));

    // (B) 起動タスクを登録（config 読み込み / cache warm / listener bind）
    let config_task = ready.ready_callback("load-config").expect("fresh name");
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        let raw = r#"{ "addr": "127.0.0.1:8080", "workers": 4 }"#;
        match serde_json::from_str::<ServerConfig>(raw) {
            Ok(config) => {
                println!("config loaded: addr={} workers={}", config.addr, config.workers);
                config_task.succeed();
            }
            Err(e) => config_task.fail(format!("config decode: {e}")),
        }
    });

    // cache warm は weak dependency: 失敗しても起動は続行する
    let warm_task = ready
        .ready_callback_with("warm-cache", TaskOptions::new().weak_dep(true))
        .expect("fresh name");
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        warm_task.fail("cache backend unreachable");
    });

    // listener bind は 400ms かかるので timeout シグナルが一度出る
    let bind_task = ready.ready_callback("bind-listener").expect("fresh name");
    tokio::spawn(async move {
        sleep(Duration::from_millis(400)).await;
        bind_task.succeed();
    });

    // (C) aggregate な ready 通知を待つ
    match ready.ready().await {
        Ok(()) => println!("server is ready"),
        Err(error) => println!("server failed to boot: {error}"),
    }

    // 転送タスクが最後のイベントを流しきるのを待つ
    sleep(Duration::from_millis(10)).await;
}
