use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{timestamp_now, Ticket, TicketAction, TicketStatus, ValidDay};
use crate::store::codec::{self, TICKET_COLUMNS, TICKET_HEADER};
use crate::store::{ensure_table, CellRange, Row, RowStore};
use crate::utils::error::AppError;
use crate::utils::ids;

pub const MAX_TICKETS_PER_BATCH: usize = 1000;

/// Ticket lifecycle on top of the ticket sheet.
///
/// Mutations re-read the sheet and are serialized within this process.
pub struct TicketService {
    store: Arc<dyn RowStore>,
    sheet: String,
    write_lock: Mutex<()>,
}

impl TicketService {
    pub fn new(store: Arc<dyn RowStore>, sheet: impl Into<String>) -> Self {
        Self {
            store,
            sheet: sheet.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn band(&self) -> CellRange {
        CellRange::columns(&self.sheet, 0, TICKET_COLUMNS - 1)
    }

    /// Writes the header row and widens legacy rows to the current layout.
    pub async fn ensure_layout(&self) -> Result<usize, AppError> {
        let _guard = self.write_lock.lock().await;
        Ok(ensure_table(
            self.store.as_ref(),
            &self.sheet,
            &TICKET_HEADER,
            codec::migrate_ticket_row,
        )
        .await?)
    }

    async fn read_rows(&self) -> Result<Vec<Row>, AppError> {
        Ok(self.store.read_all(&self.band()).await?)
    }

    fn find(rows: &[Row], id: &str) -> Result<Option<(u32, Ticket)>, AppError> {
        match codec::records(rows, &TICKET_HEADER).find(|(_, row)| row[0].trim() == id) {
            Some((row_number, row)) => Ok(Some((row_number, codec::ticket_from_row(row, row_number)?))),
            None => Ok(None),
        }
    }

    async fn append(
        &self,
        existing_rows: usize,
        ids: Vec<String>,
        valid_day: ValidDay,
    ) -> Result<Vec<Ticket>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let now = timestamp_now();
        let tickets: Vec<Ticket> = ids
            .into_iter()
            .map(|id| Ticket::new(id, valid_day, now))
            .collect();

        // Row 1 is the header even on a sheet that has never been written.
        let first_row = existing_rows.max(1) as u32 + 1;
        let last_row = first_row + tickets.len() as u32 - 1;
        let rows = tickets.iter().map(codec::ticket_to_row).collect();
        self.store
            .write_range(
                &CellRange::rows(&self.sheet, 0, TICKET_COLUMNS - 1, first_row, last_row),
                rows,
            )
            .await?;

        tracing::info!(
            count = tickets.len(),
            valid_day = %valid_day,
            first_row,
            "Tickets created"
        );
        Ok(tickets)
    }

    /// Appends one unredeemed ticket per id.
    pub async fn create_tickets(
        &self,
        ids: &[String],
        valid_day: ValidDay,
    ) -> Result<Vec<Ticket>, AppError> {
        let _guard = self.write_lock.lock().await;
        let rows = self.read_rows().await?;

        let mut taken: HashSet<&str> = codec::records(&rows, &TICKET_HEADER)
            .map(|(_, row)| row[0].trim())
            .collect();
        for id in ids {
            if !taken.insert(id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Ticket id '{id}' is already in use"
                )));
            }
        }

        self.append(rows.len(), ids.to_vec(), valid_day).await
    }

    /// Generates `quantity` fresh ticket ids and creates the tickets.
    pub async fn issue_tickets(
        &self,
        quantity: usize,
        valid_day: ValidDay,
    ) -> Result<Vec<Ticket>, AppError> {
        if !(1..=MAX_TICKETS_PER_BATCH).contains(&quantity) {
            return Err(AppError::ValidationError(format!(
                "Quantity must be between 1 and {MAX_TICKETS_PER_BATCH}"
            )));
        }

        let _guard = self.write_lock.lock().await;
        let rows = self.read_rows().await?;
        let taken: HashSet<String> = codec::records(&rows, &TICKET_HEADER)
            .map(|(_, row)| row[0].trim().to_string())
            .collect();
        let ids = fresh_ticket_ids(taken, quantity);

        self.append(rows.len(), ids, valid_day).await
    }

    pub async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, AppError> {
        let rows = self.read_rows().await?;
        Ok(Self::find(&rows, id)?.map(|(_, ticket)| ticket))
    }

    /// All decodable tickets, optionally filtered by status.
    pub async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>, AppError> {
        let rows = self.read_rows().await?;
        let tickets = codec::records(&rows, &TICKET_HEADER)
            .filter_map(|(row_number, row)| match codec::ticket_from_row(row, row_number) {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable ticket row");
                    None
                }
            })
            .filter(|ticket| status.map_or(true, |s| ticket.status == s))
            .collect();
        Ok(tickets)
    }

    /// Applies `action`, appends it to the history and writes the row back.
    ///
    /// `view` is recorded like any other action. Redeeming a ticket that is
    /// already redeemed is refused without writing.
    pub async fn update_ticket(&self, id: &str, action: TicketAction) -> Result<Ticket, AppError> {
        let _guard = self.write_lock.lock().await;
        let rows = self.read_rows().await?;
        let (row_number, mut ticket) = Self::find(&rows, id)?
            .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))?;

        if action == TicketAction::Redeem && ticket.status == TicketStatus::Redeemed {
            return Err(AppError::AlreadyRedeemed {
                ticket_id: ticket.id,
                redeemed_at: ticket.redeemed_at,
            });
        }

        ticket.apply(action, timestamp_now());
        self.store
            .write_range(
                &CellRange::row(&self.sheet, 0, TICKET_COLUMNS - 1, row_number),
                vec![codec::ticket_to_row(&ticket)],
            )
            .await?;

        tracing::info!(ticket_id = %ticket.id, ?action, status = ticket.status.as_str(), "Ticket updated");
        Ok(ticket)
    }
}

fn fresh_ticket_ids(mut taken: HashSet<String>, quantity: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let mut ids = Vec::with_capacity(quantity);
    while ids.len() < quantity {
        let id = ids::ticket_id(&mut rng);
        if taken.insert(id.clone()) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryAction;
    use crate::store::MemoryStore;

    const SHEET: &str = "Tickets";

    async fn service() -> (Arc<MemoryStore>, TicketService) {
        let store = Arc::new(MemoryStore::new());
        let service = TicketService::new(store.clone(), SHEET);
        service.ensure_layout().await.unwrap();
        (store, service)
    }

    fn actions(ticket: &Ticket) -> Vec<HistoryAction> {
        ticket.history.iter().map(|h| h.action).collect()
    }

    #[tokio::test]
    async fn test_issue_tickets_creates_unique_unredeemed_tickets() {
        let (store, service) = service().await;
        let tickets = service.issue_tickets(25, ValidDay::Day2).await.unwrap();

        assert_eq!(tickets.len(), 25);
        let unique: HashSet<_> = tickets.iter().map(|t| t.id.clone()).collect();
        assert_eq!(unique.len(), 25);
        for ticket in &tickets {
            assert!(ids::is_ticket_id(&ticket.id), "bad id {}", ticket.id);
            assert_eq!(ticket.status, TicketStatus::Unredeemed);
            assert_eq!(actions(ticket), vec![HistoryAction::Created]);
            assert_eq!(ticket.valid_day, ValidDay::Day2);
        }

        // Header plus 25 rows.
        assert_eq!(store.snapshot(SHEET).await.len(), 26);
        let listed = service.list_tickets(None).await.unwrap();
        assert_eq!(listed, tickets);
    }

    #[tokio::test]
    async fn test_issue_tickets_rejects_out_of_range_quantity() {
        let (_, service) = service().await;
        for quantity in [0, MAX_TICKETS_PER_BATCH + 1] {
            let result = service.issue_tickets(quantity, ValidDay::Day1).await;
            assert!(matches!(result, Err(AppError::ValidationError(_))));
        }
    }

    #[tokio::test]
    async fn test_second_batch_appends_after_first() {
        let (store, service) = service().await;
        service.issue_tickets(2, ValidDay::Day1).await.unwrap();
        let second = service.issue_tickets(3, ValidDay::Day4).await.unwrap();

        let grid = store.snapshot(SHEET).await;
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[3][0], second[0].id);
        assert_eq!(grid[5][6], "day4");
    }

    #[tokio::test]
    async fn test_create_tickets_rejects_taken_ids() {
        let (_, service) = service().await;
        let ids = vec!["TKT-AAAA0001".to_string()];
        service.create_tickets(&ids, ValidDay::Day1).await.unwrap();

        let result = service.create_tickets(&ids, ValidDay::Day1).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_redeem_then_reset() {
        let (_, service) = service().await;
        let id = service.issue_tickets(1, ValidDay::Day1).await.unwrap()[0].id.clone();

        let redeemed = service.update_ticket(&id, TicketAction::Redeem).await.unwrap();
        assert_eq!(redeemed.status, TicketStatus::Redeemed);
        assert!(redeemed.redeemed_at.is_some());
        assert_eq!(actions(&redeemed), vec![HistoryAction::Created, HistoryAction::Redeemed]);

        let reset = service.update_ticket(&id, TicketAction::Reset).await.unwrap();
        assert_eq!(reset.status, TicketStatus::Unredeemed);
        assert_eq!(reset.redeemed_at, redeemed.redeemed_at);
        assert!(reset.reset_at.is_some());
        assert_eq!(
            actions(&reset),
            vec![HistoryAction::Created, HistoryAction::Redeemed, HistoryAction::Reset]
        );

        let stored = service.get_ticket(&id).await.unwrap().unwrap();
        assert_eq!(stored, reset);
    }

    #[tokio::test]
    async fn test_view_records_history_without_status_change() {
        let (_, service) = service().await;
        let id = service.issue_tickets(1, ValidDay::Day1).await.unwrap()[0].id.clone();

        let viewed = service.update_ticket(&id, TicketAction::View).await.unwrap();
        assert_eq!(viewed.status, TicketStatus::Unredeemed);
        assert_eq!(actions(&viewed), vec![HistoryAction::Created, HistoryAction::Viewed]);

        let stored = service.get_ticket(&id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn test_double_redeem_is_refused() {
        let (_, service) = service().await;
        let id = service.issue_tickets(1, ValidDay::Day1).await.unwrap()[0].id.clone();
        service.update_ticket(&id, TicketAction::Redeem).await.unwrap();

        let result = service.update_ticket(&id, TicketAction::Redeem).await;
        assert!(matches!(result, Err(AppError::AlreadyRedeemed { .. })));
        let stored = service.get_ticket(&id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_redeems_admit_once() {
        let (_, service) = service().await;
        let id = service.issue_tickets(1, ValidDay::Day1).await.unwrap()[0].id.clone();

        let (first, second) = tokio::join!(
            service.update_ticket(&id, TicketAction::Redeem),
            service.update_ticket(&id, TicketAction::Redeem),
        );
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(AppError::AlreadyRedeemed { .. })))
                .count(),
            1
        );

        let stored = service.get_ticket(&id).await.unwrap().unwrap();
        assert_eq!(actions(&stored), vec![HistoryAction::Created, HistoryAction::Redeemed]);
    }

    #[tokio::test]
    async fn test_unknown_ticket() {
        let (_, service) = service().await;
        assert!(service.get_ticket("TKT-MISSING0").await.unwrap().is_none());
        let result = service.update_ticket("TKT-MISSING0", TicketAction::Redeem).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (_, service) = service().await;
        let tickets = service.issue_tickets(3, ValidDay::Day1).await.unwrap();
        service.update_ticket(&tickets[1].id, TicketAction::Redeem).await.unwrap();

        let redeemed = service.list_tickets(Some(TicketStatus::Redeemed)).await.unwrap();
        assert_eq!(redeemed.len(), 1);
        assert_eq!(redeemed[0].id, tickets[1].id);
        let open = service.list_tickets(Some(TicketStatus::Unredeemed)).await.unwrap();
        assert_eq!(open.len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_layout_migrates_legacy_rows() {
        let legacy = vec![
            vec!["TKT-LEGACY01".to_string(), "redeemed".to_string(), "2024-05-01T10:00:00.000Z".to_string()],
        ];
        let store = Arc::new(MemoryStore::with_rows(SHEET, legacy));
        let service = TicketService::new(store.clone(), SHEET);

        assert_eq!(service.ensure_layout().await.unwrap(), 1);
        let grid = store.snapshot(SHEET).await;
        assert_eq!(grid[0], codec::header_row(&TICKET_HEADER));
        assert_eq!(grid[1][0], "TKT-LEGACY01");
        assert_eq!(grid[1][6], "day1");

        // Already migrated: nothing to do.
        assert_eq!(service.ensure_layout().await.unwrap(), 0);
        let ticket = service.get_ticket("TKT-LEGACY01").await.unwrap().unwrap();
        assert_eq!(ticket.valid_day, ValidDay::Day1);
        assert_eq!(ticket.status, TicketStatus::Redeemed);
    }
}
