use crate::{Error, RenderSession, Result, Viewport};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

enum Command {
    SetViewport(Viewport, oneshot::Sender<Result<()>>),
    Goto(String, oneshot::Sender<Result<()>>),
    WaitFor(String, Duration, oneshot::Sender<Result<()>>),
    Screenshot(Viewport, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly rendering session backed by a dedicated worker thread.
///
/// The worker thread owns a synchronous `RenderSession` and executes commands
/// sent from async tasks, so callers get an async interface without the
/// session having to be `Send`. Dropping a `Session` without calling
/// [`Session::close`] still shuts the worker down and closes the backend.
pub struct Session {
    cmd_tx: Sender<Command>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Session {
    /// Launch a session; `launch` runs on the worker thread and builds the backend.
    pub async fn launch<S, F>(launch: F) -> Result<Self>
    where
        S: RenderSession + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        let worker = thread::Builder::new()
            .name("render-session".into())
            .spawn(move || {
                let mut session = match launch() {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::SetViewport(viewport, resp) => {
                            let _ = resp.send(session.set_viewport(viewport));
                        }
                        Command::Goto(url, resp) => {
                            let _ = resp.send(session.navigate(&url));
                        }
                        Command::WaitFor(selector, timeout, resp) => {
                            let _ = resp.send(session.wait_for_selector(&selector, timeout));
                        }
                        Command::Screenshot(clip, resp) => {
                            let _ = resp.send(session.capture_png(clip));
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(session.close());
                            return;
                        }
                    }
                }

                // Every handle is gone without an explicit close.
                if let Err(e) = session.close() {
                    log::warn!("Failed to close render session: {}", e);
                }
            })
            .map_err(|e| Error::InitializationError(format!("Failed to spawn session worker: {}", e)))?;

        // Wait for the worker to report initialization success or failure
        let init_res = init_rx
            .await
            .map_err(|e| Error::InitializationError(format!("Session worker exited during launch: {}", e)))?;
        if let Err(err) = init_res {
            let _ = worker.join();
            return Err(err);
        }

        Ok(Self {
            cmd_tx,
            worker: Some(worker),
        })
    }

    async fn request<T>(
        &self,
        what: &str,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::SessionClosed(format!("{} not sent", what)))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("{} canceled: {}", what, e)))?
    }

    /// Resize the page viewport
    pub async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.request("SetViewport", |tx| Command::SetViewport(viewport, tx))
            .await
    }

    /// Navigate to a URL and wait for it to load
    pub async fn goto(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.request("Goto", |tx| Command::Goto(url, tx)).await
    }

    /// Wait for `selector` to match, bounded by `timeout`
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.request("WaitFor", |tx| Command::WaitFor(selector, timeout, tx))
            .await
    }

    /// Capture a PNG clipped to `(0, 0, clip.width, clip.height)`
    pub async fn screenshot(&self, clip: Viewport) -> Result<Vec<u8>> {
        self.request("Screenshot", |tx| Command::Screenshot(clip, tx))
            .await
    }

    /// Shut down the worker and close the backend.
    pub async fn close(mut self) -> Result<()> {
        let res = self.request("Close", Command::Close).await;
        if let Some(worker) = self.worker.take() {
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        }
        res
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The worker notices the closed channel and closes the backend itself.
        if self.worker.take().is_some() {
            log::debug!("Render session dropped without close; worker will shut it down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RenderSession for Recorder {
        fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("viewport {}x{}", viewport.width, viewport.height));
            Ok(())
        }

        fn navigate(&mut self, url: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("goto {}", url));
            Ok(())
        }

        fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
            Err(Error::RenderTimeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }

        fn capture_png(&mut self, clip: Viewport) -> Result<Vec<u8>> {
            Ok(vec![clip.width as u8, clip.height as u8])
        }

        fn close(self) -> Result<()> {
            self.calls.lock().unwrap().push("close".into());
            Ok(())
        }
    }

    #[tokio::test]
    async fn commands_run_in_order_on_worker() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let shared = calls.clone();
        let session = Session::launch(move || Ok(Recorder { calls: shared }))
            .await
            .unwrap();

        session.set_viewport(Viewport { width: 4, height: 3 }).await.unwrap();
        session.goto("file:///tmp/a.html").await.unwrap();
        let png = session.screenshot(Viewport { width: 4, height: 3 }).await.unwrap();
        assert_eq!(png, vec![4, 3]);
        session.close().await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["viewport 4x3", "goto file:///tmp/a.html", "close"]
        );
    }

    #[tokio::test]
    async fn wait_errors_are_forwarded() {
        let session = Session::launch(|| Ok(Recorder::default())).await.unwrap();
        let err = session
            .wait_for_selector(".mermaid svg", Duration::from_millis(25))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RenderTimeout { timeout_ms: 25, .. }));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn launch_failure_is_reported() {
        let res = Session::launch(|| -> Result<Recorder> {
            Err(Error::InitializationError("no browser".into()))
        })
        .await;
        assert!(matches!(res, Err(Error::InitializationError(_))));
    }

    #[tokio::test]
    async fn dropping_session_closes_backend() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let shared = calls.clone();
        let session = Session::launch(move || Ok(Recorder { calls: shared }))
            .await
            .unwrap();
        drop(session);

        for _ in 0..100 {
            if calls.lock().unwrap().iter().any(|c| c == "close") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backend was not closed after drop");
    }
}
