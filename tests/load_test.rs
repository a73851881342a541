//! Load testing for the aggregator.

use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_load_performance() {
    // 1. Setup Mock Backends
    let b1 = common::start_json_backend(200, r#"{"currentDate":"2024/01/01"}"#).await;
    let b2 = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        (200, r#"{"currentTime":"12:00:00"}"#.to_string())
    })
    .await;

    // 2. Start Aggregator
    let bff = common::start_bff(common::config_for(&b1.url(), &b2.url())).await;

    // 3. Run Load Test
    let concurrency = 10;
    let requests_per_task = 20;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = bff.url("/api");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "every request should succeed");
    assert_eq!(b1.hits() as usize, total_requests);
    assert_eq!(b2.hits() as usize, total_requests);
    assert_eq!(bff.emitter.segments().len(), total_requests);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");
}
