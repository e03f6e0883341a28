use std::collections::{HashMap, VecDeque};

/// Muted palette handed out to builders in first-seen order.
pub const BUILDER_COLORS: [&str; 15] = [
    "#38bdf8", // sky
    "#f472b6", // pink
    "#34d399", // emerald
    "#fbbf24", // amber
    "#a78bfa", // violet
    "#fb7185", // rose
    "#2dd4bf", // teal
    "#f97316", // orange
    "#818cf8", // indigo
    "#4ade80", // green
    "#f43f5e", // red
    "#22d3ee", // cyan
    "#c084fc", // purple
    "#facc15", // yellow
    "#94a3b8", // slate
];

/// Default bound on remembered builders.
pub const MAX_TRACKED_BUILDERS: usize = 500;

/// Stable builder → color assignment, bounded with least-recently-used eviction.
#[derive(Debug)]
pub struct BuilderPalette {
    colors: HashMap<String, &'static str>,
    /// Least recently used first
    recency: VecDeque<String>,
    max_tracked: usize,
}

impl Default for BuilderPalette {
    fn default() -> Self {
        Self::new(MAX_TRACKED_BUILDERS)
    }
}

impl BuilderPalette {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            colors: HashMap::new(),
            recency: VecDeque::new(),
            max_tracked: max_tracked.max(1),
        }
    }

    /// Color for a builder key. Same key → same color while it stays tracked.
    pub fn color_for(&mut self, builder_key: &str) -> &'static str {
        if let Some(color) = self.colors.get(builder_key).copied() {
            self.touch(builder_key);
            return color;
        }

        let color = BUILDER_COLORS[self.colors.len() % BUILDER_COLORS.len()];
        self.colors.insert(builder_key.to_string(), color);
        self.recency.push_back(builder_key.to_string());

        while self.colors.len() > self.max_tracked {
            match self.recency.pop_front() {
                Some(oldest) => {
                    self.colors.remove(&oldest);
                }
                None => break,
            }
        }
        color
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    fn touch(&mut self, builder_key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == builder_key) {
            if let Some(key) = self.recency.remove(pos) {
                self.recency.push_back(key);
            }
        }
    }
}

/// Label for a builder with no known name: first 10 characters of the key.
pub fn fallback_label(builder_key: &str) -> String {
    let prefix: String = builder_key.chars().take(10).collect();
    format!("{}...", prefix)
}
