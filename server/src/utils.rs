use shared::MAX_NAME_LEN;

const PALETTE: [&str; 8] = [
    "#3b82f6", "#ef4444", "#22c55e", "#a855f7", "#f97316", "#06b6d4", "#ec4899", "#eab308",
];

// Pick a display color from a fixed palette based on client ID
pub fn generate_color(client_id: u32) -> String {
    let index = (client_id.max(1) as usize - 1) % PALETTE.len();
    PALETTE[index].to_string()
}

// Trimmed, length-capped name, or `Player<id>` when nothing usable was sent
pub fn display_name(client_id: u32, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.chars().take(MAX_NAME_LEN).collect(),
        None => format!("Player{}", client_id),
    }
}

// Client-chosen color, or a palette color when absent or blank
pub fn display_color(client_id: u32, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|color| !color.is_empty()) {
        Some(color) => color.to_string(),
        None => generate_color(client_id),
    }
}
