// ABOUTME: Activity entity for student-submitted extracurricular records under faculty review
// ABOUTME: Also carries self-declared certifications, distinguished by reserved categories

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const CERT_COURSE: &str = "CERT_COURSE";
pub const CERT_INTERNSHIP: &str = "CERT_INTERNSHIP";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub category: String,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub credits: Option<i32>,
    pub certificate_file: Option<String>,
    pub status: ActivityStatus,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_certification(&self) -> bool {
        self.category == CERT_COURSE || self.category == CERT_INTERNSHIP
    }

    /// Credits that count toward a portfolio: zero unless approved.
    pub fn earned_credits(&self) -> i64 {
        match self.status {
            ActivityStatus::Approved => i64::from(self.credits.unwrap_or(0)),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
