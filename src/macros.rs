/// Compile a regex once and hand out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).expect("vocabulary regex must compile"));
        &*RE
    }};
}

/// Build a lazily initialised set of lowercase words.
macro_rules! word_set {
    ($($word:literal),* $(,)?) => {
        once_cell::sync::Lazy::new(|| std::collections::HashSet::from([$($word),*]))
    };
}
