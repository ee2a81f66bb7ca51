//! Report generation, storage and signed download links

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::today;
use crate::domain::cuy::{CuyStatus, Sex};
use crate::domain::feed::MovementKind;
use crate::domain::reproduction::LitterStatistics;
use crate::domain::report::{Cell, Report, ReportFormat, ReportId, ReportKind, ReportTable};
use crate::domain::expense::ExpenseSummary;
use crate::domain::sales::{PaymentMethod, SalesStatistics};
use crate::domain::{DateRange, DomainError, Page, Pagination};
use crate::infrastructure::download::{DownloadSigner, TokenError};
use crate::infrastructure::observability::record_report_generated;
use crate::infrastructure::report::render;
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateReportRequest {
    pub kind: ReportKind,
    pub format: ReportFormat,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    #[serde(flatten)]
    pub report: Report,
    pub download: SignedUrl,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    stores: Stores,
    output_dir: PathBuf,
    signer: DownloadSigner,
}

impl ReportService {
    pub fn new(stores: Stores, output_dir: impl Into<PathBuf>, signer: DownloadSigner) -> Self {
        Self {
            stores,
            output_dir: output_dir.into(),
            signer,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn generate(
        &self,
        request: GenerateReportRequest,
    ) -> Result<GeneratedReport, DomainError> {
        let range = DateRange::new(request.from, request.to)?;
        let started = Instant::now();

        let mut table = self.build_table(request.kind, range).await?;
        if range != DateRange::unbounded() {
            table.title = format!("{} ({})", table.title, describe_range(range));
        }

        let mut report = Report::new(request.kind, request.format, range);
        report.title = table.title.clone();
        report.row_count = table.rows.len();

        let format = request.format;
        let bytes = tokio::task::spawn_blocking(move || render(&table, format))
            .await
            .map_err(|e| DomainError::internal(format!("Report rendering task failed: {}", e)))??;

        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create report directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let path = self.file_path(&report);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            DomainError::storage(format!("Failed to write report {}: {}", path.display(), e))
        })?;
        report.size_bytes = bytes.len() as u64;

        let report = match self.stores.reports.create(report).await {
            Ok(report) => report,
            Err(e) => {
                remove_file(&path).await;
                return Err(e);
            }
        };

        record_report_generated(report.kind.as_str(), report.format.as_str(), started.elapsed());
        info!(
            id = %report.id,
            kind = report.kind.as_str(),
            format = report.format.as_str(),
            rows = report.row_count,
            bytes = report.size_bytes,
            "Report generated"
        );

        let download = self.sign(&report);
        Ok(GeneratedReport { report, download })
    }

    pub async fn get(&self, id: &str) -> Result<Report, DomainError> {
        let report_id = ReportId::parse(id)?;
        self.stores
            .reports
            .get(&report_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Report '{}' not found", id)))
    }

    /// Newest first
    pub async fn list(&self, pagination: Pagination) -> Result<Page<Report>, DomainError> {
        let mut reports = self.stores.reports.list().await?;
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(reports, pagination))
    }

    /// Remove metadata and file; a file already gone is not an error
    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let report = self.get(id).await?;
        remove_file(&self.file_path(&report)).await;

        info!(id = %report.id, "Deleting report");
        self.stores.reports.delete(&report.id).await?;
        Ok(())
    }

    pub async fn signed_url(&self, id: &str) -> Result<SignedUrl, DomainError> {
        let report = self.get(id).await?;
        Ok(self.sign(&report))
    }

    pub fn verify_token(&self, id: &str, token: &str) -> Result<(), TokenError> {
        self.signer.verify(id, token, Utc::now())
    }

    /// Report metadata plus the path of an existing file
    pub async fn locate(&self, id: &str) -> Result<(Report, PathBuf), DomainError> {
        let report = self.get(id).await?;
        let path = self.file_path(&report);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok((report, path)),
            Ok(_) => Err(DomainError::not_found(format!(
                "File of report '{}' not found",
                report.id
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DomainError::not_found(format!(
                "File of report '{}' not found",
                report.id
            ))),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to read report file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Delete reports older than `retention_days`, returning how many were removed
    pub async fn cleanup(&self, retention_days: u32) -> Result<usize, DomainError> {
        let now = Utc::now();
        let mut removed = 0;

        for report in self.stores.reports.list().await? {
            if !report.is_expired(now, retention_days) {
                continue;
            }

            remove_file(&self.file_path(&report)).await;
            self.stores.reports.delete(&report.id).await?;
            removed += 1;
        }

        if removed > 0 {
            info!(removed, retention_days, "Expired reports removed");
        }

        Ok(removed)
    }

    pub fn file_path(&self, report: &Report) -> PathBuf {
        self.output_dir.join(report.stored_file_name())
    }

    fn sign(&self, report: &Report) -> SignedUrl {
        let signed = self.signer.sign(report.id.as_str(), Utc::now());
        SignedUrl {
            url: format!("/api/descargas/{}?token={}", report.id, signed.token),
            expires_at: signed.expires_at,
        }
    }

    pub async fn build_table(
        &self,
        kind: ReportKind,
        range: DateRange,
    ) -> Result<ReportTable, DomainError> {
        match kind {
            ReportKind::Inventory => self.inventory(range).await,
            ReportKind::Sales => self.sales(range).await,
            ReportKind::Expenses => self.expenses(range).await,
            ReportKind::Health => self.health(range).await,
            ReportKind::Reproduction => self.reproduction(range).await,
            ReportKind::Feed => self.feed(range).await,
            ReportKind::Financial => self.financial(range).await,
        }
    }

    async fn cuy_codes(&self) -> Result<HashMap<String, String>, DomainError> {
        Ok(self
            .stores
            .cuyes
            .list()
            .await?
            .into_iter()
            .map(|c| (c.id.to_string(), c.code))
            .collect())
    }

    /// Active animals born within the range
    async fn inventory(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let cages: HashMap<String, String> = self
            .stores
            .cages
            .list()
            .await?
            .into_iter()
            .map(|c| (c.id.to_string(), c.code))
            .collect();

        let mut cuyes: Vec<_> = self
            .stores
            .cuyes
            .list()
            .await?
            .into_iter()
            .filter(|c| c.status == CuyStatus::Active && range.contains(c.birth_date))
            .collect();
        cuyes.sort_by(|a, b| a.code.cmp(&b.code));

        let date = today();
        let mut table = ReportTable::new(
            ReportKind::Inventory.title(),
            &["Codigo", "Sexo", "Raza", "Etapa", "Nacimiento", "Edad (dias)", "Peso (kg)", "Jaula"],
        );

        let mut males = 0;
        for cuy in &cuyes {
            if cuy.sex == Sex::Male {
                males += 1;
            }

            table.push_row(vec![
                Cell::text(&cuy.code),
                cuy.sex.as_str().into(),
                Cell::text(&cuy.breed),
                cuy.stage.as_str().into(),
                cuy.birth_date.to_string().into(),
                (cuy.age_days(date).max(0) as f64).into(),
                cuy.weight_kg.map(Cell::from).unwrap_or(Cell::Empty),
                Cell::optional(
                    cuy.cage_id
                        .as_ref()
                        .and_then(|id| cages.get(id.as_str()).cloned()),
                ),
            ]);
        }

        table.push_summary("Total activos", cuyes.len());
        table.push_summary("Machos", males);
        table.push_summary("Hembras", cuyes.len() - males);
        Ok(table)
    }

    async fn sales(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let mut sales: Vec<_> = self
            .stores
            .sales
            .list()
            .await?
            .into_iter()
            .filter(|s| range.contains(s.date))
            .collect();
        sales.sort_by(|a, b| a.date.cmp(&b.date));

        let mut table = ReportTable::new(
            ReportKind::Sales.title(),
            &["Fecha", "Cliente", "Unidades", "Total", "Pago", "Estado"],
        );

        for sale in &sales {
            table.push_row(vec![
                sale.date.to_string().into(),
                Cell::text(&sale.customer_name),
                sale.items.len().into(),
                sale.total.into(),
                payment_label(sale.payment_method).into(),
                sale.status.as_str().into(),
            ]);
        }

        let stats = SalesStatistics::from_sales(&sales);
        table.push_summary("Ventas completadas", stats.sales);
        table.push_summary("Unidades vendidas", stats.units_sold);
        table.push_summary("Ingresos", money(stats.revenue));
        table.push_summary("Precio promedio", money(stats.average_price));
        Ok(table)
    }

    async fn expenses(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let mut expenses: Vec<_> = self
            .stores
            .expenses
            .list()
            .await?
            .into_iter()
            .filter(|e| range.contains(e.date))
            .collect();
        expenses.sort_by(|a, b| a.date.cmp(&b.date));

        let mut table = ReportTable::new(
            ReportKind::Expenses.title(),
            &["Fecha", "Categoria", "Descripcion", "Proveedor", "Comprobante", "Monto"],
        );

        for expense in &expenses {
            table.push_row(vec![
                expense.date.to_string().into(),
                expense.category.as_str().into(),
                Cell::text(&expense.description),
                Cell::optional(expense.supplier.clone()),
                Cell::optional(expense.receipt_number.clone()),
                expense.amount.into(),
            ]);
        }

        let summary = ExpenseSummary::from_expenses(&expenses);
        table.push_summary("Total", money(summary.total));
        for (category, amount) in &summary.by_category {
            table.push_summary(category.as_str(), money(*amount));
        }
        Ok(table)
    }

    async fn health(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let codes = self.cuy_codes().await?;
        let mut records: Vec<_> = self
            .stores
            .health_records
            .list()
            .await?
            .into_iter()
            .filter(|r| range.contains(r.date))
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date));

        let mut table = ReportTable::new(
            ReportKind::Health.title(),
            &[
                "Fecha",
                "Cuy",
                "Tipo",
                "Descripcion",
                "Tratamiento",
                "Costo",
                "Estado",
                "Seguimiento",
            ],
        );

        let mut open = 0;
        let mut cost = Decimal::ZERO;
        for record in &records {
            if record.is_open() {
                open += 1;
            }
            cost += record.cost.unwrap_or_default();

            table.push_row(vec![
                record.date.to_string().into(),
                Cell::optional(codes.get(record.cuy_id.as_str()).cloned()),
                record.kind.as_str().into(),
                Cell::text(&record.description),
                Cell::optional(record.treatment.clone()),
                record.cost.map(Cell::from).unwrap_or(Cell::Empty),
                Cell::text(if record.is_open() { "open" } else { "resolved" }),
                Cell::optional(record.follow_up_date.map(|d| d.to_string())),
            ]);
        }

        table.push_summary("Registros", records.len());
        table.push_summary("Abiertos", open);
        table.push_summary("Costo total", money(cost));
        Ok(table)
    }

    async fn reproduction(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let codes = self.cuy_codes().await?;
        let mut litters: Vec<_> = self
            .stores
            .litters
            .list()
            .await?
            .into_iter()
            .filter(|l| range.contains(l.birth_date))
            .collect();
        litters.sort_by(|a, b| a.birth_date.cmp(&b.birth_date));

        let mut table = ReportTable::new(
            ReportKind::Reproduction.title(),
            &["Parto", "Madre", "Padre", "Vivos", "Muertos", "Destetados", "Destete"],
        );

        for litter in &litters {
            table.push_row(vec![
                litter.birth_date.to_string().into(),
                Cell::optional(codes.get(litter.mother_id.as_str()).cloned()),
                Cell::optional(
                    litter
                        .father_id
                        .as_ref()
                        .and_then(|id| codes.get(id.as_str()).cloned()),
                ),
                litter.born_alive.into(),
                litter.born_dead.into(),
                litter.weaned_count.map(Cell::from).unwrap_or(Cell::Empty),
                Cell::optional(litter.weaning_date.map(|d| d.to_string())),
            ]);
        }

        let stats = LitterStatistics::from_litters(&litters);
        let active = self
            .stores
            .pregnancies
            .list()
            .await?
            .iter()
            .filter(|p| p.is_active())
            .count();

        table.push_summary("Camadas", stats.litters);
        table.push_summary("Nacidos vivos", stats.born_alive);
        table.push_summary("Nacidos muertos", stats.born_dead);
        table.push_summary("Tamano promedio", format!("{:.2}", stats.average_litter_size));
        table.push_summary("Mortalidad", format!("{:.1}%", stats.mortality_ratio * 100.0));
        table.push_summary("Preñeces activas", active);
        Ok(table)
    }

    /// Current stock per item with movement totals inside the range
    async fn feed(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let mut totals: HashMap<String, (f64, f64)> = HashMap::new();
        for movement in self.stores.feed_movements.list().await? {
            if !range.contains(movement.date) {
                continue;
            }
            let entry = totals.entry(movement.feed_id.to_string()).or_default();
            match movement.kind {
                MovementKind::In => entry.0 += movement.quantity_kg,
                MovementKind::Out => entry.1 += movement.quantity_kg,
            }
        }

        let mut feeds = self.stores.feeds.list().await?;
        feeds.sort_by_key(|f| f.name.to_lowercase());

        let mut table = ReportTable::new(
            ReportKind::Feed.title(),
            &[
                "Alimento",
                "Tipo",
                "Stock (kg)",
                "Minimo (kg)",
                "Entradas (kg)",
                "Salidas (kg)",
                "Costo unitario",
                "Estado",
            ],
        );

        let mut low = 0;
        for feed in &feeds {
            let (input, output) = totals.get(feed.id.as_str()).copied().unwrap_or_default();
            if feed.is_low_stock() {
                low += 1;
            }

            table.push_row(vec![
                Cell::text(&feed.name),
                feed.kind.as_str().into(),
                feed.stock_kg.into(),
                feed.min_stock_kg.into(),
                input.into(),
                output.into(),
                feed.unit_cost.into(),
                Cell::text(if feed.is_low_stock() { "bajo" } else { "ok" }),
            ]);
        }

        table.push_summary("Alimentos", feeds.len());
        table.push_summary("Con stock bajo", low);
        Ok(table)
    }

    /// Monthly revenue, expenses and net result
    async fn financial(&self, range: DateRange) -> Result<ReportTable, DomainError> {
        let mut months: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();

        for sale in self.stores.sales.list().await? {
            if sale.is_completed() && range.contains(sale.date) {
                months.entry(month_key(sale.date)).or_default().0 += sale.total;
            }
        }

        for expense in self.stores.expenses.list().await? {
            if range.contains(expense.date) {
                months.entry(month_key(expense.date)).or_default().1 += expense.amount;
            }
        }

        let mut table = ReportTable::new(
            ReportKind::Financial.title(),
            &["Mes", "Ingresos", "Gastos", "Resultado"],
        );

        let (mut revenue, mut expenses) = (Decimal::ZERO, Decimal::ZERO);
        for (month, (income, cost)) in &months {
            revenue += *income;
            expenses += *cost;
            table.push_row(vec![
                Cell::text(month),
                (*income).into(),
                (*cost).into(),
                (*income - *cost).into(),
            ]);
        }

        table.push_summary("Ingresos totales", money(revenue));
        table.push_summary("Gastos totales", money(expenses));
        table.push_summary("Resultado neto", money(revenue - expenses));
        Ok(table)
    }
}

async fn remove_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove report file"),
    }
}

fn describe_range(range: DateRange) -> String {
    match (range.from, range.to) {
        (Some(from), Some(to)) => format!("{} a {}", from, to),
        (Some(from), None) => format!("desde {}", from),
        (None, Some(to)) => format!("hasta {}", to),
        (None, None) => String::new(),
    }
}

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "efectivo",
        PaymentMethod::Transfer => "transferencia",
        PaymentMethod::Other => "otro",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cuy::Cuy;
    use crate::domain::expense::{Expense, ExpenseCategory};
    use crate::domain::sales::{Sale, SaleItem};
    use chrono::Duration;
    use tempfile::TempDir;

    struct Fixture {
        service: ReportService,
        stores: Stores,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::in_memory();

        Fixture {
            service: ReportService::new(
                stores.clone(),
                dir.path().join("reports"),
                DownloadSigner::new("secret", 600),
            ),
            stores,
            _dir: dir,
        }
    }

    fn request(kind: ReportKind, format: ReportFormat) -> GenerateReportRequest {
        GenerateReportRequest {
            kind,
            format,
            from: None,
            to: None,
        }
    }

    async fn seed(stores: &Stores) {
        let cuy = Cuy::new("CU-01", Sex::Female, "Peru", today() - Duration::days(60), today())
            .unwrap();
        let sold = Cuy::new("CU-02", Sex::Male, "Peru", today() - Duration::days(90), today())
            .unwrap();
        let sale = Sale::new(
            today(),
            "Rosa",
            vec![SaleItem {
                cuy_id: sold.id.clone(),
                price: Decimal::new(40, 0),
                weight_kg: None,
            }],
            PaymentMethod::Cash,
        )
        .unwrap();
        let expense =
            Expense::new(today(), ExpenseCategory::Feed, Decimal::new(15, 0), "Alfalfa").unwrap();

        stores.cuyes.create(cuy).await.unwrap();
        stores.cuyes.create(sold).await.unwrap();
        stores.sales.create(sale).await.unwrap();
        stores.expenses.create(expense).await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_writes_file_and_metadata() {
        let f = fixture();
        seed(&f.stores).await;

        let generated = f
            .service
            .generate(request(ReportKind::Inventory, ReportFormat::Csv))
            .await
            .unwrap();
        let report = &generated.report;

        assert_eq!(report.row_count, 2);
        assert!(report.file_name.starts_with("inventory-"));
        assert!(report.file_name.ends_with(".csv"));

        let path = f.service.file_path(report);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("Codigo,Sexo"));
        assert!(content.contains("CU-01"));
        assert_eq!(report.size_bytes, content.len() as u64);

        assert!(generated
            .download
            .url
            .starts_with(&format!("/api/descargas/{}?token=", report.id)));
    }

    #[tokio::test]
    async fn test_financial_table_nets_revenue_and_expenses() {
        let f = fixture();
        seed(&f.stores).await;

        let table = f
            .service
            .build_table(ReportKind::Financial, DateRange::unbounded())
            .await
            .unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][3], Cell::Number(25.0));
        assert!(table
            .summary
            .contains(&("Resultado neto".to_string(), "25.00".to_string())));
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let f = fixture();
        let mut request = request(ReportKind::Sales, ReportFormat::Pdf);
        request.from = Some(today());
        request.to = Some(today() - Duration::days(1));

        let err = f.service.generate(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_range_filters_rows() {
        let f = fixture();
        seed(&f.stores).await;

        let past = DateRange::new(None, Some(today() - Duration::days(30))).unwrap();
        let table = f.service.build_table(ReportKind::Sales, past).await.unwrap();
        assert!(table.rows.is_empty());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let f = fixture();
        let generated = f
            .service
            .generate(request(ReportKind::Expenses, ReportFormat::Excel))
            .await
            .unwrap();
        let id = generated.report.id.to_string();

        tokio::fs::remove_file(f.service.file_path(&generated.report))
            .await
            .unwrap();
        assert!(f.service.locate(&id).await.unwrap_err().is_not_found());

        f.service.delete(&id).await.unwrap();
        assert!(f.service.get(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_reports() {
        let f = fixture();
        let old = f
            .service
            .generate(request(ReportKind::Feed, ReportFormat::Pdf))
            .await
            .unwrap()
            .report;
        let fresh = f
            .service
            .generate(request(ReportKind::Health, ReportFormat::Csv))
            .await
            .unwrap()
            .report;

        let mut aged = old.clone();
        aged.created_at = Utc::now() - Duration::days(40);
        f.stores.reports.update(aged).await.unwrap();

        assert_eq!(f.service.cleanup(30).await.unwrap(), 1);
        assert!(!f.service.file_path(&old).exists());
        assert!(f.service.locate(fresh.id.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn test_signed_url_verifies() {
        let f = fixture();
        let generated = f
            .service
            .generate(request(ReportKind::Reproduction, ReportFormat::Csv))
            .await
            .unwrap();
        let id = generated.report.id.to_string();

        let signed = f.service.signed_url(&id).await.unwrap();
        let token = signed.url.split("token=").nth(1).unwrap();

        assert!(f.service.verify_token(&id, token).is_ok());
        assert!(f.service.verify_token(&ReportId::generate().to_string(), token).is_err());
    }
}
