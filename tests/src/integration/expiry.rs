//! # Expiry
//!
//! Requests that never reach consensus are answered with a timeout, and a
//! report finalized after the deadline is not delivered a second time.

#[cfg(test)]
mod tests {
    use crate::harness::SimulatedDon;
    use ocr3_capability::{CapabilityConfig, ReportingPlugin};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

    fn config() -> CapabilityConfig {
        CapabilityConfig::default().with_request_timeout(REQUEST_TIMEOUT)
    }

    #[tokio::test]
    async fn test_request_without_quorum_times_out() {
        let mut don = SimulatedDon::new(4, 1, config()).unwrap();
        don.register("w1", json!({ "aggregation_method": "identical" }))
            .await
            .unwrap();
        let futures = don.submit("w1", "e1", &[(1, json!(1))]).await.unwrap();

        let round = don.run_round().await.unwrap();
        assert!(round.reports.is_empty());

        don.clock.advance(REQUEST_TIMEOUT);
        for future in futures {
            let response = timeout(Duration::from_secs(1), future)
                .await
                .expect("timeout waiting for expiry")
                .expect("callback closed without a value");
            assert!(response.is_timeout());
        }

        // Expired work is gone from the next query.
        let round = don.run_round().await.unwrap();
        assert_eq!(round.observers, 4);
        assert!(round.reports.is_empty());
        don.close();
    }

    #[tokio::test]
    async fn test_late_report_is_not_delivered_after_timeout() {
        let mut don = SimulatedDon::new(4, 1, config()).unwrap();
        don.register("w1", json!({ "aggregation_method": "identical" }))
            .await
            .unwrap();
        let futures = don.submit_all("w1", "e1", json!(1)).await.unwrap();

        let round = don.run_round_without_accept().await.unwrap();
        assert_eq!(round.reports.len(), 1);

        don.clock.advance(REQUEST_TIMEOUT);
        for future in futures {
            let response = timeout(Duration::from_secs(1), future)
                .await
                .expect("timeout waiting for expiry")
                .expect("callback closed without a value");
            assert!(response.is_timeout());
        }

        for node in &don.nodes {
            let accepted = node
                .plugin
                .should_accept_attested_report(round.seq_nr, &round.reports[0])
                .await
                .unwrap();
            assert!(!accepted);
            assert!(node.capability.store().is_empty());
        }
        don.close();
    }

    #[tokio::test]
    async fn test_batch_size_spreads_work_over_rounds() {
        let mut don = SimulatedDon::new(4, 1, config().with_batch_size(2)).unwrap();
        don.register("w1", json!({ "aggregation_method": "identical" }))
            .await
            .unwrap();
        for id in ["e1", "e2", "e3"] {
            don.submit_all("w1", id, json!(id)).await.unwrap();
        }

        assert_eq!(don.run_round().await.unwrap().reports.len(), 2);
        assert_eq!(don.run_round().await.unwrap().reports.len(), 1);
        assert_eq!(don.run_round().await.unwrap().reports.len(), 0);
        don.close();
    }
}
