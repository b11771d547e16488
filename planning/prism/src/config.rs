/// Options of the translation, fixed when a [`Translator`](crate::Translator) is built.
#[derive(Clone, Debug, Default)]
pub struct TranslatorConfig {
    /// When set, the adapter accepts undeclared predicates, types and constants instead of
    /// reporting them. Undeclared types are then treated as direct subtypes of `object`.
    pub skip_sanity_checks: bool,
}

impl TranslatorConfig {
    pub fn lenient() -> Self {
        TranslatorConfig {
            skip_sanity_checks: true,
        }
    }
}
