pub struct Icons;

impl Icons {
    pub const DATABASE: &str = "🗄️";
    pub const TABLE: &str = "📋";
    pub const LINK: &str = "🔗";
    pub const TAG: &str = "🏷️";
    pub const CHECK: &str = "✅";
    pub const EMPTY: &str = "∅";
}
