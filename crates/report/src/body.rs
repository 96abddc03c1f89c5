//! The shared report body: header, per-study sections, flagged rows.

use std::collections::HashMap;

use lis_core::{display_value, LabError, LabResult, Order, Protocol, RangeFlag, ResultRecord};

/// Field key reserved for free-text observations. Never rendered as a
/// table row; shown as a separate block under the study's table instead.
pub const OBSERVATIONS_KEY: &str = "observations";

/// Shown when the order carries no insurer.
const NO_INSURER: &str = "N/A";

/// Patient and order identification at the top of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub patient_name: String,
    pub dni: String,
    pub date: String,
    pub insurer: String,
}

/// One table row: a field's label, formatted value, reference interval,
/// and out-of-range flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub value: String,
    pub reference: String,
    pub flag: Option<RangeFlag>,
}

/// One study's slice of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    /// `Name (CODE)` of the study, from the protocol definition.
    pub title: String,
    pub rows: Vec<ReportRow>,
    /// Free-text observations, present only when non-empty.
    pub observations: Option<String>,
}

/// The complete report content, independent of any rendering target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBody {
    pub header: ReportHeader,
    pub sections: Vec<ReportSection>,
}

impl ReportBody {
    /// Derives the report content from an order, its result records, and
    /// the protocol definitions the results reference.
    ///
    /// # Errors
    ///
    /// Returns `LabError::NotFound` when a result references a protocol
    /// that is not among `protocols`.
    pub fn build(
        order: &Order,
        results: &[ResultRecord],
        protocols: &[Protocol],
    ) -> LabResult<Self> {
        let by_id: HashMap<&str, &Protocol> =
            protocols.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut sections = Vec::with_capacity(results.len());
        for result in results {
            let protocol =
                by_id
                    .get(result.protocol_id.as_str())
                    .ok_or(LabError::NotFound {
                        kind: "protocol",
                        id: result.protocol_id.clone(),
                    })?;

            let rows = protocol
                .fields
                .iter()
                .filter(|field| field.key != OBSERVATIONS_KEY)
                .map(|field| {
                    let value = result.values.get(&field.key);
                    ReportRow {
                        label: field.label.clone(),
                        value: display_value(value, field.unit()),
                        reference: field
                            .reference()
                            .map(|r| r.display())
                            .unwrap_or_else(|| "-".to_string()),
                        flag: value.and_then(|v| field.flag(v)),
                    }
                })
                .collect();

            let observations = result
                .values
                .get(OBSERVATIONS_KEY)
                .map(|v| v.to_string())
                .filter(|s| !s.trim().is_empty());

            sections.push(ReportSection {
                title: format!("{} ({})", protocol.name, protocol.code),
                rows,
                observations,
            });
        }

        Ok(Self {
            header: ReportHeader {
                patient_name: order.patient.full_name(),
                dni: order.patient.dni.clone(),
                date: order.scheduled_at.format("%Y-%m-%d").to_string(),
                insurer: order
                    .insurer
                    .clone()
                    .unwrap_or_else(|| NO_INSURER.to_string()),
            },
            sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis_core::{
        Field, FieldKind, OrderStatus, Patient, ReferenceRange, ResultValue, StudySnapshot,
    };
    use lis_types::ProtocolCode;

    fn haemogram() -> Protocol {
        Protocol {
            id: "pr-hemo".into(),
            name: "Haemogram".into(),
            code: ProtocolCode::new("HEMO").unwrap(),
            fields: vec![
                Field {
                    key: "hb".into(),
                    label: "Haemoglobin".into(),
                    unit: Some("g/dL".into()),
                    kind: FieldKind::Number {
                        reference: Some(ReferenceRange {
                            low: Some(12.0),
                            high: Some(16.0),
                        }),
                    },
                },
                Field {
                    key: OBSERVATIONS_KEY.into(),
                    label: "Observations".into(),
                    unit: None,
                    kind: FieldKind::Text,
                },
            ],
        }
    }

    fn order() -> Order {
        Order {
            id: "o1".into(),
            patient: Patient {
                id: "p1".into(),
                first_name: "Ana".into(),
                last_name: "Gomez".into(),
                dni: "30111222".into(),
                dob: "1990-01-01".into(),
                phone: None,
                insurer: None,
            },
            studies: vec![StudySnapshot {
                protocol_id: "pr-hemo".into(),
                protocol_code: ProtocolCode::new("HEMO").unwrap(),
                display_name: "Haemogram".into(),
            }],
            insurer: None,
            auth_number: None,
            authorized: true,
            sample_taken: true,
            status: OrderStatus::Completed,
            scheduled_at: chrono::Utc::now(),
        }
    }

    fn result(values: &[(&str, ResultValue)]) -> ResultRecord {
        ResultRecord {
            id: "r1".into(),
            order_id: "o1".into(),
            patient_id: "p1".into(),
            protocol_id: "pr-hemo".into(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            comments: String::new(),
        }
    }

    #[test]
    fn observations_never_appear_in_the_table_body() {
        let body = ReportBody::build(
            &order(),
            &[result(&[
                ("hb", ResultValue::Number(14.0)),
                (OBSERVATIONS_KEY, ResultValue::Text("slight haemolysis".into())),
            ])],
            &[haemogram()],
        )
        .unwrap();

        let section = &body.sections[0];
        assert_eq!(section.rows.len(), 1);
        assert_eq!(section.rows[0].label, "Haemoglobin");
        assert_eq!(section.observations.as_deref(), Some("slight haemolysis"));
    }

    #[test]
    fn empty_observations_produce_no_block() {
        let body = ReportBody::build(
            &order(),
            &[result(&[
                ("hb", ResultValue::Number(14.0)),
                (OBSERVATIONS_KEY, ResultValue::Text("  ".into())),
            ])],
            &[haemogram()],
        )
        .unwrap();
        assert_eq!(body.sections[0].observations, None);

        let body = ReportBody::build(
            &order(),
            &[result(&[("hb", ResultValue::Number(14.0))])],
            &[haemogram()],
        )
        .unwrap();
        assert_eq!(body.sections[0].observations, None);
    }

    #[test]
    fn out_of_range_values_are_flagged_in_rows() {
        let body = ReportBody::build(
            &order(),
            &[result(&[("hb", ResultValue::Number(10.0))])],
            &[haemogram()],
        )
        .unwrap();

        let row = &body.sections[0].rows[0];
        assert_eq!(row.flag, Some(RangeFlag::Low));
        assert_eq!(row.value, "10 g/dL");
        assert_eq!(row.reference, "12 - 16");
    }

    #[test]
    fn absent_values_render_the_placeholder_unflagged() {
        let body = ReportBody::build(&order(), &[result(&[])], &[haemogram()]).unwrap();
        let row = &body.sections[0].rows[0];
        assert_eq!(row.value, "-");
        assert_eq!(row.flag, None);
    }

    #[test]
    fn missing_protocols_are_an_explicit_not_found() {
        let err = ReportBody::build(&order(), &[result(&[])], &[]).unwrap_err();
        assert!(matches!(err, LabError::NotFound { kind: "protocol", .. }));
    }

    #[test]
    fn header_defaults_the_insurer() {
        let body = ReportBody::build(&order(), &[], &[haemogram()]).unwrap();
        assert_eq!(body.header.insurer, "N/A");
        assert_eq!(body.header.patient_name, "Ana Gomez");
    }
}
