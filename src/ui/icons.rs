pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const EYE: &str = "👀";
    pub const NEW: &str = "✨";
    pub const MOD: &str = "📝";
    pub const DEL: &str = "🗑️";
    pub const PACKAGE: &str = "📦";
    pub const PLUG: &str = "🔌";
    pub const GEAR: &str = "⚙️";
    pub const UP: &str = "⬆️";
    pub const DOWN: &str = "⬇️";
    pub const MAG: &str = "🔎";
    pub const GLOBE: &str = "🌍";
}
