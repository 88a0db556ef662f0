use crate::inventory::{Image, Inventory, KeepReason, Repository};
use colored::{Color, Colorize};
use comfy_table::{Cell, Table};

/// Color bucket a repository or image row falls into, independent of how
/// it ends up rendered — kept separate from rendering so the underlying
/// ratios and rollups can be unit tested without a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    AllDeleted,
    PartiallyDeleted,
    AllKept,
}

impl RowTone {
    fn color(self) -> Color {
        match self {
            RowTone::AllDeleted => Color::Red,
            RowTone::PartiallyDeleted => Color::Yellow,
            RowTone::AllKept => Color::Green,
        }
    }
}

/// Plain computed row for one repository, independent of rendering.
pub struct RepositoryRow {
    pub link: String,
    pub delete_count: usize,
    pub total_count: usize,
    pub delete_size_bytes: u64,
    pub total_size_bytes: u64,
    pub most_recent_delete_uploaded_ms: Option<u128>,
    pub tone: RowTone,
}

fn row_for(repository: &Repository) -> RepositoryRow {
    let total_count = repository.images.len();
    let delete_images: Vec<&Image> = repository
        .images
        .iter()
        .filter(|i| i.kept_data.reason == KeepReason::None)
        .collect();
    let delete_count = delete_images.len();
    let total_size_bytes: u64 = repository.images.iter().map(|i| i.size_bytes).sum();
    let delete_size_bytes: u64 = delete_images.iter().map(|i| i.size_bytes).sum();
    let most_recent_delete_uploaded_ms = delete_images.iter().filter_map(|i| i.uploaded_ms.parse::<u128>().ok()).max();

    let tone = if total_count == 0 || delete_count == 0 {
        RowTone::AllKept
    } else if delete_count == total_count {
        RowTone::AllDeleted
    } else {
        RowTone::PartiallyDeleted
    };

    RepositoryRow {
        link: repository.link.clone(),
        delete_count,
        total_count,
        delete_size_bytes,
        total_size_bytes,
        most_recent_delete_uploaded_ms,
        tone,
    }
}

fn relative_time(uploaded_ms: u128) -> String {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(uploaded_ms);
    let age_secs = now_ms.saturating_sub(uploaded_ms) / 1000;
    match age_secs {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}

/// Renders one row per repository: delete ratio, size delta, and the most
/// recent image that would be deleted, colored by `RowTone`.
pub fn render_aggregate(inventory: &Inventory) -> String {
    let mut rows: Vec<RepositoryRow> = inventory.iter().map(row_for).collect();
    rows.sort_by(|a, b| a.link.cmp(&b.link));

    let mut table = Table::new();
    table.set_header(vec!["repository", "to delete", "size to delete / total", "most recent to delete"]);

    for row in &rows {
        let pct = if row.total_count == 0 {
            0.0
        } else {
            100.0 * row.delete_count as f64 / row.total_count as f64
        };
        let recent = row
            .most_recent_delete_uploaded_ms
            .map(relative_time)
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&row.link).fg(to_comfy_color(row.tone)),
            Cell::new(format!("{:.0}% ({}/{})", pct, row.delete_count, row.total_count)),
            Cell::new(format!(
                "{} / {}",
                human_bytes(row.delete_size_bytes),
                human_bytes(row.total_size_bytes)
            )),
            Cell::new(recent),
        ]);
    }

    format!("{table}\n{}", summary_line(inventory))
}

/// Renders one table per repository listing every image and why it was
/// kept (or that it will be deleted).
pub fn render_analytical(inventory: &Inventory) -> String {
    let mut out = String::new();
    let mut repos: Vec<&Repository> = inventory.iter().collect();
    repos.sort_by(|a, b| a.link.cmp(&b.link));

    for repository in repos {
        out.push_str(&format!("{}\n", repository.link.bold()));
        let mut table = Table::new();
        table.set_header(vec!["kept", "tags", "digest", "size", "cluster", "uploaded"]);

        for image in &repository.images {
            let kept = image.kept_data.reason != KeepReason::None;
            let tags = if image.tags.is_empty() {
                "<untagged>".to_string()
            } else {
                image.tags.iter().cloned().collect::<Vec<_>>().join(", ")
            };
            let digest_display = image.digest.chars().take(19).collect::<String>();
            let cluster = image.kept_data.metadata.clone().unwrap_or_else(|| "-".to_string());
            let uploaded = image
                .uploaded_ms
                .parse::<u128>()
                .map(relative_time)
                .unwrap_or_else(|_| "-".to_string());

            table.add_row(vec![
                Cell::new(if kept { "keep" } else { "delete" }).fg(reason_color(image.kept_data.reason)),
                Cell::new(tags),
                Cell::new(digest_display),
                Cell::new(human_bytes(image.size_bytes)),
                Cell::new(cluster),
                Cell::new(uploaded),
            ]);
        }

        out.push_str(&format!("{table}\n\n"));
    }

    out.push_str(&summary_line(inventory));
    out
}

fn summary_line(inventory: &Inventory) -> String {
    let mut delete_count = 0usize;
    let mut keep_count = 0usize;
    let mut delete_size = 0u64;
    let mut keep_size = 0u64;
    let mut total_count = 0usize;
    let mut total_size = 0u64;

    for repository in inventory {
        for image in &repository.images {
            total_count += 1;
            total_size += image.size_bytes;
            if image.kept_data.reason == KeepReason::None {
                delete_count += 1;
                delete_size += image.size_bytes;
            } else {
                keep_count += 1;
                keep_size += image.size_bytes;
            }
        }
    }

    let delete_pct_count = pct(delete_count, total_count);
    let delete_pct_size = pct_bytes(delete_size, total_size);

    format!(
        "to delete: {delete_count} images ({delete_pct_count:.0}% of images, {delete_pct_size:.0}% of size, {})\nto keep:   {keep_count} images ({})",
        human_bytes(delete_size),
        human_bytes(keep_size)
    )
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

fn pct_bytes(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

fn to_comfy_color(tone: RowTone) -> comfy_table::Color {
    match tone.color() {
        Color::Red => comfy_table::Color::Red,
        Color::Yellow => comfy_table::Color::Yellow,
        Color::Green => comfy_table::Color::Green,
        _ => comfy_table::Color::White,
    }
}

fn reason_color(reason: KeepReason) -> comfy_table::Color {
    match reason {
        KeepReason::None => comfy_table::Color::Red,
        KeepReason::Young => comfy_table::Color::Cyan,
        KeepReason::UsedInCluster => comfy_table::Color::Magenta,
        KeepReason::WhitelistedTag | KeepReason::WhitelistedDigest | KeepReason::WhitelistedRepository => {
            comfy_table::Color::Green
        }
        KeepReason::OneOfFew => comfy_table::Color::Blue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Image, KeepReason, KeptData};

    #[test]
    fn row_tone_matches_delete_ratio() {
        let mut all_delete = Repository::new("ns/a");
        all_delete.images.push(Image::new("d1", "0"));
        assert_eq!(row_for(&all_delete).tone, RowTone::AllDeleted);

        let mut all_keep = Repository::new("ns/b");
        let mut kept_image = Image::new("d2", "0");
        kept_image.kept_data = KeptData {
            reason: KeepReason::WhitelistedTag,
            metadata: None,
        };
        all_keep.images.push(kept_image);
        assert_eq!(row_for(&all_keep).tone, RowTone::AllKept);
    }

    #[test]
    fn summary_counts_match_totals() {
        let mut repo = Repository::new("ns/a");
        repo.images.push(Image::new("d1", "0"));
        let mut kept = Image::new("d2", "0");
        kept.kept_data = KeptData {
            reason: KeepReason::OneOfFew,
            metadata: None,
        };
        repo.images.push(kept);
        let inventory = vec![repo];

        let summary = summary_line(&inventory);
        assert!(summary.contains("1 images"));
    }
}
