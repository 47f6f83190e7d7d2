use std::time::Duration;

/// Build a reqwest client with bounded connect and request timeouts.
pub fn make_http_client() -> reqwest::Result<reqwest::Client> {
    make_http_client_with(Duration::from_secs(6))
}

pub fn make_http_client_with(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(timeout)
        .build()
}

/// Exponential backoff for async ops. `op` is retried up to `attempts` more
/// times while `should_retry` accepts the error.
pub async fn retry_async<T, E, Fut, F, P>(mut attempts: u32, should_retry: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut try_num: u32 = 0;
    let mut delay_ms: u64 = 50;
    loop {
        match op(try_num).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempts == 0 || !should_retry(&e) {
                    return Err(e);
                }
                attempts -= 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(1_000);
                try_num += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::retry_async;

    #[tokio::test]
    async fn it_retries_then_succeeds() {
        let mut calls = 0;
        let res: Result<i32, i32> = retry_async(3, |_| true, move |_| {
            calls += 1;
            let c = calls;
            async move {
                if c < 3 {
                    Err(-1)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 42);
    }

    #[tokio::test]
    async fn it_stops_on_fatal_errors() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let seen = calls.clone();
        let res: Result<(), &str> = retry_async(5, |e: &&str| *e == "transient", move |_| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err("fatal") }
        })
        .await;
        assert_eq!(res.unwrap_err(), "fatal");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn builds_client() {
        assert!(super::make_http_client().is_ok());
    }
}
