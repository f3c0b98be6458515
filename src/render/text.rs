//! Shareable text and printable HTML renderings of a plan.

use serde::Serialize;
use std::fmt::Write;

use crate::models::{CostBreakdown, PlanDocument};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Headline numbers of a plan
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PlanStats {
    pub activities: usize,
    pub restaurants: usize,
    pub estimated_cost: Option<f64>,
    pub feature_tags: Vec<String>,
}

#[must_use]
pub fn plan_stats(plan: &PlanDocument) -> PlanStats {
    let days = &plan.itinerary.days;
    PlanStats {
        activities: days.iter().map(|d| d.activities.len()).sum(),
        restaurants: days.iter().map(|d| d.meals.len()).sum(),
        estimated_cost: plan.estimated_total(),
        feature_tags: plan.feature_tags(),
    }
}

/// Amount with thousands separators and at most two decimals
fn amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let whole = rounded.abs().trunc() as u64;
    let cents = ((rounded.abs() - rounded.abs().trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    match cents {
        0 => format!("{sign}{grouped}"),
        c if c % 10 == 0 => format!("{sign}{grouped}.{}", c / 10),
        c => format!("{sign}{grouped}.{c:02}"),
    }
}

fn nights(days: u32) -> u32 {
    days.saturating_sub(1)
}

fn cost_lines(costs: &CostBreakdown) -> Vec<(&'static str, f64)> {
    vec![
        ("交通", costs.transportation),
        ("住宿", costs.accommodation),
        ("餐饮", costs.food),
        ("景点门票", costs.activities),
        ("购物", costs.shopping),
    ]
}

/// Plain-text plan for sharing
#[must_use]
pub fn render_plan_text(plan: &PlanDocument) -> String {
    let mut text = String::new();
    write_plan_text(&mut text, plan).ok();
    text
}

fn write_plan_text(out: &mut String, plan: &PlanDocument) -> std::fmt::Result {
    writeln!(out, "🌍 {}旅行计划", plan.destination)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "📅 出发日期：{}", plan.start_date.as_deref().unwrap_or("待定"))?;
    writeln!(out, "⏱️ 行程天数：{}天{}晚", plan.days, nights(plan.days))?;
    writeln!(out, "💰 预算：¥{}", amount(plan.budget))?;
    writeln!(out, "👥 同行人数：{}人", plan.travelers)?;
    writeln!(out)?;

    for (i, day) in plan.itinerary.days.iter().enumerate() {
        writeln!(
            out,
            "📍 第{}天 - {}",
            i + 1,
            plan.day_date(day).unwrap_or_default()
        )?;
        writeln!(out, "{RULE}")?;

        for (n, activity) in day.activities.iter().enumerate() {
            writeln!(out, "🎯 活动{}：{}", n + 1, activity.name)?;
            if let Some(time) = &activity.time {
                writeln!(out, "   ⏰ {time}")?;
            }
            if !activity.description.is_empty() {
                writeln!(out, "   📝 {}", activity.description)?;
            }
            if activity.estimated_cost > 0.0 {
                writeln!(out, "   💳 预估：¥{}", amount(activity.estimated_cost))?;
            }
            writeln!(out)?;
        }

        for meal in &day.meals {
            let label = if meal.meal_type.is_empty() { "用餐" } else { meal.meal_type.as_str() };
            writeln!(out, "🍽️ {label}：{}", meal.restaurant)?;
            if !meal.cuisine.is_empty() {
                writeln!(out, "   {}", meal.cuisine)?;
            }
            if meal.estimated_cost > 0.0 {
                writeln!(out, "   预估：¥{}", amount(meal.estimated_cost))?;
            }
            writeln!(out)?;
        }

        if let Some(stay) = &day.accommodation {
            writeln!(out, "🏨 住宿：{}", stay.name)?;
            if let Some(kind) = &stay.accommodation_type {
                writeln!(out, "   📝 {kind}")?;
            }
            if stay.estimated_cost > 0.0 {
                writeln!(out, "   💳 预估：¥{}", amount(stay.estimated_cost))?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }

    if let Some(costs) = &plan.itinerary.cost_breakdown {
        writeln!(out, "💰 费用明细")?;
        writeln!(out, "{RULE}")?;
        for (label, value) in cost_lines(costs) {
            writeln!(out, "{label}：¥{}", amount(value))?;
        }
        writeln!(out, "合计：¥{}", amount(costs.total))?;
        writeln!(out)?;
    }

    if !plan.itinerary.tips.is_empty() {
        writeln!(out, "💡 旅行贴士")?;
        writeln!(out, "{RULE}")?;
        for tip in &plan.itinerary.tips {
            writeln!(out, "• {tip}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{RULE}")?;
    writeln!(out, "✨ 由 AI旅行规划师 生成")
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", "Microsoft YaHei", sans-serif; line-height: 1.6; color: #333; padding: 2rem; max-width: 800px; margin: 0 auto; }
    .header { text-align: center; margin-bottom: 2rem; padding-bottom: 1rem; border-bottom: 3px solid #667eea; }
    .header h1 { font-size: 2rem; color: #667eea; margin-bottom: 0.5rem; }
    .summary { background: #f8f9fa; padding: 1.5rem; border-radius: 8px; margin-bottom: 2rem; display: grid; grid-template-columns: repeat(2, 1fr); gap: 1rem; }
    .summary-item strong { color: #667eea; }
    .day-section { margin-bottom: 2rem; page-break-inside: avoid; }
    .day-title { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 0.75rem 1rem; border-radius: 8px; font-weight: bold; margin-bottom: 1rem; }
    .card { border: 1px solid #e0e0e0; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
    .card h3 { font-size: 1.1rem; margin-bottom: 0.5rem; }
    .meta { color: #666; font-size: 0.9rem; }
    .costs td { padding: 0.25rem 1rem 0.25rem 0; }
    @media print { body { padding: 0; } }
"#;

/// Printable HTML document
#[must_use]
pub fn render_plan_html(plan: &PlanDocument) -> String {
    let mut html = String::new();
    write_plan_html(&mut html, plan).ok();
    html
}

fn write_plan_html(out: &mut String, plan: &PlanDocument) -> std::fmt::Result {
    let destination = escape(&plan.destination);
    let start = escape(plan.start_date.as_deref().unwrap_or("待定"));

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"zh-CN\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"UTF-8\">")?;
    writeln!(out, "<title>{destination}旅行计划</title>")?;
    writeln!(out, "<style>{STYLE}</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<div class=\"header\"><h1>🌍 {destination}旅行计划</h1></div>")?;
    writeln!(out, "<div class=\"summary\">")?;
    writeln!(out, "<div class=\"summary-item\"><strong>📅 出发日期：</strong>{start}</div>")?;
    writeln!(
        out,
        "<div class=\"summary-item\"><strong>⏱️ 行程天数：</strong>{}天{}晚</div>",
        plan.days,
        nights(plan.days)
    )?;
    writeln!(
        out,
        "<div class=\"summary-item\"><strong>💰 预算：</strong>¥{}</div>",
        amount(plan.budget)
    )?;
    writeln!(
        out,
        "<div class=\"summary-item\"><strong>👥 同行人数：</strong>{}人</div>",
        plan.travelers
    )?;
    writeln!(out, "</div>")?;

    for (i, day) in plan.itinerary.days.iter().enumerate() {
        writeln!(out, "<div class=\"day-section\">")?;
        writeln!(
            out,
            "<div class=\"day-title\">第{}天 {}</div>",
            i + 1,
            escape(&plan.day_date(day).unwrap_or_default())
        )?;

        for activity in &day.activities {
            writeln!(out, "<div class=\"card\">")?;
            writeln!(out, "<h3>🎯 {}</h3>", escape(&activity.name))?;
            if !activity.description.is_empty() {
                writeln!(out, "<p>{}</p>", escape(&activity.description))?;
            }
            write_meta(out, activity.time.as_deref(), activity.estimated_cost)?;
            writeln!(out, "</div>")?;
        }

        for meal in &day.meals {
            writeln!(out, "<div class=\"card\">")?;
            writeln!(
                out,
                "<h3>🍽️ {} {}</h3>",
                escape(&meal.meal_type),
                escape(&meal.restaurant)
            )?;
            if !meal.cuisine.is_empty() {
                writeln!(out, "<p>{}</p>", escape(&meal.cuisine))?;
            }
            write_meta(out, meal.time.as_deref(), meal.estimated_cost)?;
            writeln!(out, "</div>")?;
        }

        if let Some(stay) = &day.accommodation {
            writeln!(out, "<div class=\"card\">")?;
            writeln!(out, "<h3>🏨 {}</h3>", escape(&stay.name))?;
            if let Some(kind) = &stay.accommodation_type {
                writeln!(out, "<p>{}</p>", escape(kind))?;
            }
            write_meta(out, None, stay.estimated_cost)?;
            writeln!(out, "</div>")?;
        }
        writeln!(out, "</div>")?;
    }

    if let Some(costs) = &plan.itinerary.cost_breakdown {
        writeln!(out, "<h2>💰 费用明细</h2>")?;
        writeln!(out, "<table class=\"costs\">")?;
        for (label, value) in cost_lines(costs) {
            writeln!(out, "<tr><td>{label}</td><td>¥{}</td></tr>", amount(value))?;
        }
        writeln!(
            out,
            "<tr><td><strong>合计</strong></td><td><strong>¥{}</strong></td></tr>",
            amount(costs.total)
        )?;
        writeln!(out, "</table>")?;
    }

    if !plan.itinerary.tips.is_empty() {
        writeln!(out, "<h2>💡 旅行贴士</h2>")?;
        writeln!(out, "<ul>")?;
        for tip in &plan.itinerary.tips {
            writeln!(out, "<li>{}</li>", escape(tip))?;
        }
        writeln!(out, "</ul>")?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn write_meta(out: &mut String, time: Option<&str>, cost: f64) -> std::fmt::Result {
    let mut parts = Vec::new();
    if let Some(time) = time {
        parts.push(format!("⏰ {}", escape(time)));
    }
    if cost > 0.0 {
        parts.push(format!("💳 ¥{}", amount(cost)));
    }
    if parts.is_empty() {
        return Ok(());
    }
    writeln!(out, "<p class=\"meta\">{}</p>", parts.join(" · "))
}
