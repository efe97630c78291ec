use log::{info, warn};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::domain::calendar::parse_month_label;
use crate::backend::domain::clock::Clock;
use crate::backend::domain::errors::{DomainError, DomainResult};
use crate::backend::storage::traits::{FeeEntryStorage, KeyValueStore, StudentStorage};
use crate::backend::storage::{FeeEntryRepository, StudentRepository};
use shared::{CreateFeeRequest, FeeEntry, FeeStatus, MonthlyFeeTotal};

/// Service for fee entries
#[derive(Clone)]
pub struct FeeService {
    fee_repository: FeeEntryRepository,
    student_repository: StudentRepository,
    clock: Arc<dyn Clock>,
}

impl FeeService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fee_repository: FeeEntryRepository::new(store.clone()),
            student_repository: StudentRepository::new(store),
            clock,
        }
    }

    /// Flip a fee between Payment Due and Completed
    pub async fn toggle_fee_status(&self, fee_id: &str) -> DomainResult<FeeEntry> {
        info!("Toggling fee status: {}", fee_id);

        let mut fee = self
            .fee_repository
            .get_fee(fee_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Fee entry", fee_id))?;

        fee.status = fee.status.toggled();
        self.fee_repository.save_fee(&fee).await?;

        info!("Fee {} is now {}", fee.id, fee.status.label());
        Ok(fee)
    }

    /// Add a fee entry by hand, dated today
    pub async fn create_manual_fee(&self, request: CreateFeeRequest) -> DomainResult<FeeEntry> {
        info!(
            "Creating manual fee for student {}: {} ({})",
            request.student_id, request.amount, request.month
        );

        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(DomainError::validation("Fee amount must be greater than zero"));
        }
        let month = request.month.trim().to_string();
        if month.is_empty() {
            return Err(DomainError::validation("Fee month cannot be empty"));
        }

        let student = self
            .student_repository
            .get_student(&request.student_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Student", &request.student_id))?;

        let now = self.clock.utc_now();
        let fee = FeeEntry {
            id: FeeEntry::generate_id(&student.id, now.timestamp_millis() as u64),
            student_id: student.id,
            student_name: student.name,
            amount: request.amount,
            month,
            date: self.clock.today(),
            status: FeeStatus::PaymentDue,
            created_at: now,
        };
        self.fee_repository.save_fee(&fee).await?;

        info!("Created fee {} for {}", fee.id, fee.student_name);
        Ok(fee)
    }

    /// Fee entries, optionally for one student, newest first
    pub async fn list_fees(&self, student_id: Option<&str>) -> Vec<FeeEntry> {
        let mut fees: Vec<FeeEntry> = self
            .fee_repository
            .list_fees()
            .await
            .into_iter()
            .filter(|fee| student_id.map_or(true, |id| fee.student_id == id))
            .collect();

        fees.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        fees
    }

    /// Sum of fee amounts per month label.
    ///
    /// Labels that read as "Month YYYY" come first in calendar order, any
    /// other labels follow alphabetically.
    pub async fn monthly_totals(&self, student_id: Option<&str>) -> Vec<MonthlyFeeTotal> {
        let mut totals: HashMap<String, f64> = HashMap::new();
        for fee in self.list_fees(student_id).await {
            *totals.entry(fee.month).or_insert(0.0) += fee.amount;
        }

        let mut totals: Vec<MonthlyFeeTotal> = totals
            .into_iter()
            .map(|(month, total)| MonthlyFeeTotal { month, total })
            .collect();

        totals.sort_by(|a, b| {
            match (parse_month_label(&a.month), parse_month_label(&b.month)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.month.cmp(&b.month),
            }
        });
        totals
    }

    pub async fn delete_fee_entry(&self, fee_id: &str) -> DomainResult<()> {
        info!("Deleting fee entry: {}", fee_id);

        if !self.fee_repository.delete_fee(fee_id).await? {
            warn!("Fee entry not found: {}", fee_id);
            return Err(DomainError::not_found("Fee entry", fee_id));
        }
        Ok(())
    }
}
