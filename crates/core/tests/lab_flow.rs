//! End-to-end flow tests driven against an in-memory backend fake.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use lis_core::{
    available_actions, Backend, Field, FieldKind, LabError, LabResult, NewOrder, NewResult,
    Order, OrderAction, OrderDraft, OrderStatus, OrderUpdate, Patient, Protocol, RangeFlag,
    ReferenceRange, ResultEntry, ResultRecord, ResultValue, WorklistService,
};
use lis_types::ProtocolCode;

/// In-memory stand-in for the REST backend. Counts mutating calls so tests
/// can assert that local validation never reaches the network.
#[derive(Default)]
struct FakeBackend {
    patients: Mutex<Vec<Patient>>,
    orders: Mutex<Vec<Order>>,
    results: Mutex<Vec<ResultRecord>>,
    create_order_calls: AtomicUsize,
    update_order_calls: AtomicUsize,
    /// Protocol ids whose result creation the fake rejects.
    fail_results_for: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn register_patient(&self, patient: Patient) {
        self.patients.lock().unwrap().push(patient);
    }

    fn fail_results_for(&self, protocol_id: &str) {
        self.fail_results_for
            .lock()
            .unwrap()
            .push(protocol_id.to_string());
    }

    fn stored_results(&self) -> Vec<ResultRecord> {
        self.results.lock().unwrap().clone()
    }
}

impl Backend for FakeBackend {
    async fn list_orders(&self) -> LabResult<Vec<Order>> {
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn get_order(&self, id: &str) -> LabResult<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(LabError::NotFound {
                kind: "order",
                id: id.to_string(),
            })
    }

    async fn create_order(&self, order: &NewOrder) -> LabResult<Order> {
        self.create_order_calls.fetch_add(1, Ordering::SeqCst);
        let patient = self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == order.patient_id)
            .cloned()
            .ok_or(LabError::NotFound {
                kind: "patient",
                id: order.patient_id.clone(),
            })?;

        let mut orders = self.orders.lock().unwrap();
        let created = Order {
            id: format!("o{}", orders.len() + 1),
            patient,
            studies: order.studies.clone(),
            insurer: order.insurer.clone(),
            auth_number: order.auth_number.clone(),
            authorized: order.authorized,
            sample_taken: false,
            status: OrderStatus::Pending,
            scheduled_at: order.scheduled_at,
        };
        orders.push(created.clone());
        Ok(created)
    }

    async fn update_order(&self, id: &str, update: &OrderUpdate) -> LabResult<Order> {
        self.update_order_calls.fetch_add(1, Ordering::SeqCst);
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(LabError::NotFound {
                kind: "order",
                id: id.to_string(),
            })?;
        if let Some(status) = update.status {
            order.status = status;
        }
        if let Some(sample_taken) = update.sample_taken {
            order.sample_taken = sample_taken;
        }
        Ok(order.clone())
    }

    async fn create_result(&self, result: &NewResult) -> LabResult<ResultRecord> {
        if self
            .fail_results_for
            .lock()
            .unwrap()
            .contains(&result.protocol_id)
        {
            return Err(LabError::Backend("result rejected by server".into()));
        }
        let mut results = self.results.lock().unwrap();
        let record = ResultRecord {
            id: format!("r{}", results.len() + 1),
            order_id: result.order_id.clone(),
            patient_id: result.patient_id.clone(),
            protocol_id: result.protocol_id.clone(),
            values: result.values.clone(),
            comments: result.comments.clone(),
        };
        results.push(record.clone());
        Ok(record)
    }

    async fn results_for_order(&self, order_id: &str) -> LabResult<Vec<ResultRecord>> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect())
    }
}

fn ana() -> Patient {
    Patient {
        id: "p1".into(),
        first_name: "Ana".into(),
        last_name: "Gomez".into(),
        dni: "30111222".into(),
        dob: "1990-01-01".into(),
        phone: None,
        insurer: None,
    }
}

fn haemogram() -> Protocol {
    Protocol {
        id: "pr-hemo".into(),
        name: "Haemogram".into(),
        code: ProtocolCode::new("HEMO").unwrap(),
        fields: vec![Field {
            key: "hb".into(),
            label: "Haemoglobin".into(),
            unit: Some("g/dL".into()),
            kind: FieldKind::Number {
                reference: Some(ReferenceRange {
                    low: Some(12.0),
                    high: Some(16.0),
                }),
            },
        }],
    }
}

fn glucose() -> Protocol {
    Protocol {
        id: "pr-gluc".into(),
        name: "Glucose".into(),
        code: ProtocolCode::new("GLUC").unwrap(),
        fields: vec![Field {
            key: "glu".into(),
            label: "Glucose".into(),
            unit: Some("mg/dL".into()),
            kind: FieldKind::Number { reference: None },
        }],
    }
}

#[tokio::test]
async fn full_flow_from_order_to_completed_report_data() {
    let backend = FakeBackend::default();
    backend.register_patient(ana());
    let hemo = haemogram();

    // Compose and submit the order.
    let mut draft = OrderDraft::new();
    draft.select_patient(ana());
    draft.add_study(&hemo);
    let order = draft.submit(&backend).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    // Start work from the worklist.
    let worklist = WorklistService::new(&backend);
    let orders = worklist.start(&order).await.unwrap();
    assert_eq!(orders[0].status, OrderStatus::InProcess);

    // Record an out-of-range haemoglobin and submit.
    let mut entry = ResultEntry::new(&orders[0]);
    entry
        .set_value("pr-hemo", "hb", ResultValue::Number(10.0))
        .unwrap();
    let completed = entry.submit(&backend).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);

    // The stored value flags below range (10 < 12).
    let results = backend.results_for_order(&completed.id).await.unwrap();
    assert_eq!(results.len(), 1);
    let value = results[0].values.get("hb").unwrap();
    assert_eq!(hemo.fields[0].flag(value), Some(RangeFlag::Low));
}

#[tokio::test]
async fn in_range_values_carry_no_flag() {
    let hemo = haemogram();
    let value = ResultValue::Number(14.0);
    assert_eq!(hemo.fields[0].flag(&value), None);
}

#[tokio::test]
async fn incomplete_drafts_never_reach_the_backend() {
    let backend = FakeBackend::default();
    backend.register_patient(ana());

    // No patient, no studies.
    let draft = OrderDraft::new();
    assert!(matches!(
        draft.submit(&backend).await,
        Err(LabError::Validation(_))
    ));

    // Patient but no studies.
    let mut draft = OrderDraft::new();
    draft.select_patient(ana());
    assert!(matches!(
        draft.submit(&backend).await,
        Err(LabError::Validation(_))
    ));

    // Studies but no patient.
    let mut draft = OrderDraft::new();
    draft.add_study(&haemogram());
    assert!(matches!(
        draft.submit(&backend).await,
        Err(LabError::Validation(_))
    ));

    assert_eq!(backend.create_order_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mid_sequence_result_failure_stops_and_keeps_status() {
    let backend = FakeBackend::default();
    backend.register_patient(ana());

    let mut draft = OrderDraft::new();
    draft.select_patient(ana());
    draft.add_study(&haemogram());
    draft.add_study(&glucose());
    let order = draft.submit(&backend).await.unwrap();

    let worklist = WorklistService::new(&backend);
    let orders = worklist.start(&order).await.unwrap();

    // The second study's create is rejected by the server.
    backend.fail_results_for("pr-gluc");

    let mut entry = ResultEntry::new(&orders[0]);
    entry
        .set_value("pr-hemo", "hb", ResultValue::Number(13.0))
        .unwrap();
    entry
        .set_value("pr-gluc", "glu", ResultValue::Number(90.0))
        .unwrap();
    let err = entry.submit(&backend).await.unwrap_err();
    assert!(matches!(err, LabError::Backend(_)));

    // The first result stayed persisted, the second was never written, and
    // the order did not advance.
    let stored = backend.stored_results();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].protocol_id, "pr-hemo");
    let order = backend.get_order(&orders[0].id).await.unwrap();
    assert_eq!(order.status, OrderStatus::InProcess);
}

#[tokio::test]
async fn completed_orders_reject_start_and_sample_changes_locally() {
    let backend = FakeBackend::default();
    backend.register_patient(ana());

    let mut draft = OrderDraft::new();
    draft.select_patient(ana());
    draft.add_study(&haemogram());
    let order = draft.submit(&backend).await.unwrap();

    let worklist = WorklistService::new(&backend);
    let orders = worklist.start(&order).await.unwrap();
    let entry = ResultEntry::new(&orders[0]);
    entry.submit(&backend).await.unwrap();

    let completed = backend.get_order(&order.id).await.unwrap();
    let updates_so_far = backend.update_order_calls.load(Ordering::SeqCst);

    // The only action left for a completed order is viewing the report.
    assert_eq!(available_actions(&completed), vec![OrderAction::ViewReport]);

    assert!(matches!(
        worklist.start(&completed).await,
        Err(LabError::InvalidTransition { .. })
    ));
    assert!(matches!(
        worklist.toggle_sample(&completed).await,
        Err(LabError::Validation(_))
    ));
    // Neither rejection issued a request.
    assert_eq!(
        backend.update_order_calls.load(Ordering::SeqCst),
        updates_so_far
    );
}

#[tokio::test]
async fn sample_flag_toggles_independently_of_status() {
    let backend = FakeBackend::default();
    backend.register_patient(ana());

    let mut draft = OrderDraft::new();
    draft.select_patient(ana());
    draft.add_study(&haemogram());
    let order = draft.submit(&backend).await.unwrap();

    let worklist = WorklistService::new(&backend);
    let orders = worklist.toggle_sample(&order).await.unwrap();
    assert!(orders[0].sample_taken);
    assert_eq!(orders[0].status, OrderStatus::Pending);

    let orders = worklist.toggle_sample(&orders[0]).await.unwrap();
    assert!(!orders[0].sample_taken);
}

#[tokio::test]
async fn study_snapshots_survive_protocol_deletion() {
    let backend = FakeBackend::default();
    backend.register_patient(ana());

    let mut draft = OrderDraft::new();
    draft.select_patient(ana());
    draft.add_study(&haemogram());
    let order = draft.submit(&backend).await.unwrap();

    // The template is later deleted (a hard external operation); the
    // stored snapshot keeps the identity the order was created with.
    let stored = backend.get_order(&order.id).await.unwrap();
    assert_eq!(stored.studies[0].display_name, "Haemogram");
    assert_eq!(stored.studies[0].protocol_code.as_str(), "HEMO");
    assert_eq!(stored.scheduled_at.date_naive(), Utc::now().date_naive());
}
