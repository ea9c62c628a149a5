//! # Transmitter Flow
//!
//! Signed reports handed to the [`ContractTransmitter`] travel back into the
//! capability as `"transmit"` execute calls and reach the waiting callers
//! with their signatures attached.

#[cfg(test)]
mod tests {
    use crate::harness::SimulatedDon;
    use ocr3_capability::domain::{encode, ReportInfo, ReportWithInfo, RequestId};
    use ocr3_capability::{
        CallbackCapability, CapabilityConfig, CapabilityError, ContractTransmitter,
        InMemoryCapabilityRegistry, CAPABILITY_ID,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// One transmitter per node, each resolving that node's capability.
    fn transmitters(don: &SimulatedDon) -> Vec<ContractTransmitter> {
        don.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let registry = Arc::new(InMemoryCapabilityRegistry::new());
                let capability: Arc<dyn CallbackCapability> = node.capability.clone();
                registry.add(capability);
                ContractTransmitter::new(CAPABILITY_ID, registry, format!("0xnode{}", i))
            })
            .collect()
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_transmitted_report_reaches_every_caller() {
        let mut don = SimulatedDon::new(4, 1, CapabilityConfig::default()).unwrap();
        don.register("w1", json!({ "aggregation_method": "identical" }))
            .await
            .unwrap();
        let futures = don.submit_all("w1", "e1", json!({ "x": 1 })).await.unwrap();

        let round = don.run_round_without_accept().await.unwrap();
        assert_eq!(round.reports.len(), 1);
        let report = round.reports[0].clone();

        let signatures = don.signatures();
        for transmitter in transmitters(&don) {
            transmitter
                .transmit([7u8; 32], round.seq_nr, report.clone(), signatures.clone())
                .await
                .unwrap();
        }

        for future in futures {
            let response = timeout(Duration::from_secs(1), future)
                .await
                .expect("timeout waiting for response")
                .expect("callback closed without a value");
            let value = response.value.unwrap();
            assert_eq!(value["report"], json!(hex::encode(&report.report)));
            assert_eq!(value["signatures"].as_array().unwrap().len(), 3);
        }
        don.close();
    }

    #[tokio::test]
    async fn test_second_transmission_is_not_found() {
        let mut don = SimulatedDon::new(4, 1, CapabilityConfig::default()).unwrap();
        don.register("w1", json!({ "aggregation_method": "identical" }))
            .await
            .unwrap();
        let _futures = don.submit_all("w1", "e1", json!(1)).await.unwrap();
        let round = don.run_round_without_accept().await.unwrap();

        let transmitter = transmitters(&don).remove(0);
        let report = round.reports[0].clone();
        transmitter
            .transmit([0u8; 32], round.seq_nr, report.clone(), vec![])
            .await
            .unwrap();

        let again = transmitter
            .transmit([0u8; 32], round.seq_nr, report, vec![])
            .await;
        assert_eq!(again.unwrap_err(), CapabilityError::NotFound("e1".into()));
        don.close();
    }

    #[tokio::test]
    async fn test_nothing_to_report_delivers_empty_value() {
        let don = SimulatedDon::new(4, 1, CapabilityConfig::default()).unwrap();
        let futures = don
            .submit("w1", "e1", &[(0, json!(1))])
            .await
            .unwrap();

        let info = ReportInfo {
            id: RequestId {
                workflow_execution_id: "e1".into(),
                workflow_id: "w1".into(),
            },
            should_report: false,
        };
        let report = ReportWithInfo {
            report: b"ignored".to_vec(),
            info: encode("report info", &info).unwrap(),
        };
        transmitters(&don)
            .remove(0)
            .transmit([0u8; 32], 1, report, vec![])
            .await
            .unwrap();

        let response = futures.into_iter().next().unwrap().await.unwrap();
        assert!(response.value.is_none());
        assert!(response.err.is_none());
        don.close();
    }
}
