//! Plain-text rendering of service data for the terminal.

use fieldbook_core::booking::ScheduleSelection;
use fieldbook_core::models::{Field, FieldDetail, OrderSummary, UserProfile};
use fieldbook_core::utils::{format_date, truncate_string};

const NAME_WIDTH: usize = 28;
const CODE_WIDTH: usize = 10;

pub fn fields(fields: &[Field]) -> String {
    if fields.is_empty() {
        return "No fields available.".to_string();
    }

    let mut lines = vec![format!(
        "{:<cw$}  {:<nw$}  {:>12}  UUID",
        "CODE",
        "NAME",
        "PRICE/HOUR",
        cw = CODE_WIDTH,
        nw = NAME_WIDTH
    )];
    lines.extend(fields.iter().map(|field| {
        format!(
            "{:<cw$}  {:<nw$}  {:>12}  {}",
            field.code.as_deref().unwrap_or("-"),
            truncate_string(&field.name, NAME_WIDTH),
            field.price_per_hour.to_string(),
            field.uuid,
            cw = CODE_WIDTH,
            nw = NAME_WIDTH
        )
    }));
    lines.join("\n")
}

pub fn field_detail(field: &FieldDetail) -> String {
    let mut lines = vec![field.name.clone()];
    if let Some(ref code) = field.code {
        lines.push(format!("  Code:        {}", code));
    }
    lines.push(format!("  Price/hour:  {}", field.price_per_hour));
    lines.extend(field.images.iter().map(|image| format!("  Image:       {}", image)));
    lines.join("\n")
}

/// Slots with their status; selected slots are marked with `*` and the
/// running total follows when anything is selected.
pub fn schedule(selection: &ScheduleSelection) -> String {
    if selection.slots().is_empty() {
        return "No schedule for this date.".to_string();
    }

    let mut lines: Vec<String> = selection
        .slots()
        .iter()
        .map(|slot| {
            let marker = if selection.is_selected(&slot.uuid) { "*" } else { " " };
            format!(
                "{} {:<19}  {:>12}  {}",
                marker,
                slot.time,
                slot.price_per_hour.to_string(),
                slot.status.label()
            )
        })
        .collect();
    if selection.has_selection() {
        lines.push(String::new());
        lines.push(format!(
            "{} slot(s) selected, total {}",
            selection.selected_ids().len(),
            selection.total_display()
        ));
    }
    lines.join("\n")
}

pub fn orders(orders: &[OrderSummary]) -> String {
    if orders.is_empty() {
        return "No bookings yet.".to_string();
    }

    let mut lines = Vec::new();
    for order in orders {
        lines.push(format!(
            "{:<14}  {:<12}  {:>12}  {}",
            order.code,
            format_date(&order.order_date),
            order.amount.to_string(),
            order.status
        ));
        if order.status.is_paid() {
            if let Some(invoice) = order.invoice() {
                lines.push(format!("    Invoice: {}", invoice));
            }
        } else if !order.payment_link.is_empty() {
            lines.push(format!("    Pay at:  {}", order.payment_link));
        }
    }
    lines.join("\n")
}

pub fn profile(user: &UserProfile) -> String {
    let rows = [
        ("Name", user.name.as_deref()),
        ("Username", user.username.as_deref()),
        ("Email", user.email.as_deref()),
        ("Phone", user.phone_number.as_deref()),
        ("Role", user.role.as_deref()),
    ];

    rows.iter()
        .map(|(label, value)| format!("{:<10}{}", format!("{}:", label), value.unwrap_or("-")))
        .collect::<Vec<_>>()
        .join("\n")
}
