//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// Trimmed value, treating blank strings as absent.
    fn get_non_empty(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
