//! Farm management endpoints mounted under `/api`

pub mod alerts;
pub mod cuyes;
pub mod dashboard;
pub mod downloads;
pub mod expenses;
pub mod feed;
pub mod health_records;
pub mod housing;
pub mod notifications;
pub mod reports;
pub mod reproduction;
pub mod sales;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Routes guarded by the API key
pub fn create_farm_router() -> Router<AppState> {
    Router::new()
        // Housing
        .route("/galpones", get(housing::list_sheds).post(housing::create_shed))
        .route(
            "/galpones/{id}",
            get(housing::get_shed)
                .put(housing::update_shed)
                .delete(housing::delete_shed),
        )
        .route("/jaulas", get(housing::list_cages).post(housing::create_cage))
        .route(
            "/jaulas/{id}",
            get(housing::get_cage)
                .put(housing::update_cage)
                .delete(housing::delete_cage),
        )
        .route("/jaulas/{id}/ocupacion", get(housing::cage_occupancy))
        // Cuyes
        .route("/cuyes", get(cuyes::list_cuyes).post(cuyes::create_cuy))
        .route("/cuyes/estadisticas", get(cuyes::cuy_statistics))
        .route(
            "/cuyes/{id}",
            get(cuyes::get_cuy)
                .put(cuyes::update_cuy)
                .delete(cuyes::delete_cuy),
        )
        .route("/cuyes/{id}/mover", post(cuyes::move_cuy))
        .route("/cuyes/{id}/muerte", post(cuyes::record_death))
        .route("/cuyes/{id}/salud", get(cuyes::cuy_health_history))
        // Reproduction
        .route(
            "/reproduccion/prenez",
            get(reproduction::list_pregnancies).post(reproduction::create_pregnancy),
        )
        .route(
            "/reproduccion/prenez/proximos-partos",
            get(reproduction::upcoming_births),
        )
        .route(
            "/reproduccion/prenez/atrasadas",
            get(reproduction::overdue_pregnancies),
        )
        .route(
            "/reproduccion/prenez/{id}",
            get(reproduction::get_pregnancy)
                .put(reproduction::update_pregnancy)
                .delete(reproduction::delete_pregnancy),
        )
        .route(
            "/reproduccion/prenez/{id}/parto",
            post(reproduction::register_birth),
        )
        .route(
            "/reproduccion/prenez/{id}/fallida",
            post(reproduction::mark_pregnancy_failed),
        )
        .route(
            "/reproduccion/camadas",
            get(reproduction::list_litters).post(reproduction::create_litter),
        )
        .route(
            "/reproduccion/camadas/estadisticas",
            get(reproduction::litter_statistics),
        )
        .route(
            "/reproduccion/camadas/{id}",
            get(reproduction::get_litter)
                .put(reproduction::update_litter)
                .delete(reproduction::delete_litter),
        )
        .route(
            "/reproduccion/camadas/{id}/destete",
            post(reproduction::wean_litter),
        )
        .route(
            "/reproduccion/camadas/{id}/crias",
            post(reproduction::register_offspring),
        )
        // Feed
        .route("/alimentos", get(feed::list_feeds).post(feed::create_feed))
        .route("/alimentos/stock-bajo", get(feed::low_stock))
        .route(
            "/alimentos/{id}",
            get(feed::get_feed)
                .put(feed::update_feed)
                .delete(feed::delete_feed),
        )
        .route("/alimentos/{id}/reabastecer", post(feed::restock_feed))
        .route("/alimentos/{id}/consumir", post(feed::consume_feed))
        .route("/alimentos/{id}/movimientos", get(feed::feed_movements))
        // Health
        .route(
            "/salud",
            get(health_records::list_health_records).post(health_records::create_health_record),
        )
        .route("/salud/seguimientos", get(health_records::pending_follow_ups))
        .route(
            "/salud/{id}",
            get(health_records::get_health_record)
                .put(health_records::update_health_record)
                .delete(health_records::delete_health_record),
        )
        .route("/salud/{id}/resolver", post(health_records::resolve_health_record))
        // Sales and expenses
        .route("/ventas", get(sales::list_sales).post(sales::create_sale))
        .route("/ventas/estadisticas", get(sales::sales_statistics))
        .route(
            "/ventas/{id}",
            get(sales::get_sale)
                .put(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route("/ventas/{id}/anular", post(sales::cancel_sale))
        .route("/gastos", get(expenses::list_expenses).post(expenses::create_expense))
        .route("/gastos/resumen", get(expenses::expense_summary))
        .route(
            "/gastos/{id}",
            get(expenses::get_expense)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        // Dashboard and alerts
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/alertas", get(alerts::list_alerts))
        .route("/alertas/resumen", get(alerts::alert_summary))
        .route("/alertas/generar", post(alerts::generate_alerts))
        .route("/alertas/leer-todas", post(alerts::mark_all_alerts_read))
        .route(
            "/alertas/{id}",
            get(alerts::get_alert).delete(alerts::delete_alert),
        )
        .route("/alertas/{id}/leer", post(alerts::mark_alert_read))
        .route("/alertas/{id}/resolver", post(alerts::resolve_alert))
        .route("/notificaciones", get(notifications::list_notifications))
        .route("/notificaciones/{id}", get(notifications::get_notification))
        .route(
            "/notificaciones/{id}/reintentar",
            post(notifications::retry_notification),
        )
        // Reports
        .route("/reportes", get(reports::list_reports).post(reports::generate_report))
        .route(
            "/reportes/{id}",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route("/reportes/{id}/enlace", get(reports::report_link))
        .route("/reportes/{id}/descargar", get(downloads::download_report))
}

/// Signed-link downloads; the token stands in for the API key
pub fn create_download_router() -> Router<AppState> {
    Router::new().route("/descargas/{id}", get(downloads::download_with_token))
}
