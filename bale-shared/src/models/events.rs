use uuid::Uuid;

/// Which side of a trade a rating event is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectRole {
    /// Bundle unpacking: the bundle's declared rating vs the carved-out product's rating.
    Supplier,
    /// Product review: the product's listed rating vs the consumer's review.
    Reseller,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RatingRecorded {
    pub subject_id: Uuid,
    pub role: SubjectRole,
    pub declared_rating: f64,
    pub observed_rating: f64,
    pub recorded_at: i64,
}

impl RatingRecorded {
    pub fn new(subject_id: Uuid, role: SubjectRole, declared_rating: f64, observed_rating: f64) -> Self {
        Self {
            subject_id,
            role,
            declared_rating,
            observed_rating,
            recorded_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_recorded_wire_format() {
        let event = RatingRecorded::new(Uuid::new_v4(), SubjectRole::Supplier, 4.0, 3.5);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["role"], "SUPPLIER");
        assert_eq!(json["declared_rating"], 4.0);

        let back: RatingRecorded = serde_json::from_value(json).unwrap();
        assert_eq!(back.subject_id, event.subject_id);
        assert_eq!(back.role, SubjectRole::Supplier);
    }
}
