//! Provider scope for the modal API
//!
//! Pages and components reach the modal slot through a [`ModalScope`] handed
//! down by the application. Asking a scope without a provider is an
//! integration mistake and fails immediately instead of yielding a disabled
//! stand-in.

use super::{
    manager::{ModalHandle, ModalManager},
    types::{ModalError, ModalResult},
};

/// Carries the modal provider, if one was installed
#[derive(Debug, Clone, Default)]
pub struct ModalScope {
    provider: Option<ModalManager>,
}

impl ModalScope {
    /// Scope without a provider
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(manager: ModalManager) -> Self {
        Self {
            provider: Some(manager),
        }
    }

    /// Install or replace the provider
    pub fn provide(&mut self, manager: ModalManager) {
        self.provider = Some(manager);
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Typed modal access for results of type `T`
    pub fn use_modal<T: Send + 'static>(&self) -> ModalResult<ModalHandle<T>> {
        self.provider
            .as_ref()
            .map(ModalManager::handle::<T>)
            .ok_or(ModalError::ProviderMissing {
                result_type: std::any::type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::dom::Document;

    #[test]
    fn test_missing_provider_fails_fast() {
        let scope = ModalScope::new();
        let err = scope.use_modal::<String>().err().unwrap();
        assert!(matches!(
            err,
            ModalError::ProviderMissing { result_type } if result_type.ends_with("String")
        ));
    }

    #[test]
    fn test_handles_share_the_provider_slot() {
        let manager = ModalManager::new(Document::new().shared());
        let scope = ModalScope::with_provider(manager.clone());

        let strings = scope.use_modal::<String>().unwrap();
        let numbers = scope.use_modal::<u32>().unwrap();
        assert!(!strings.is_open());
        assert!(!numbers.is_open());
        assert!(scope.has_provider());

        let mut scope = ModalScope::new();
        scope.provide(manager);
        assert!(scope.use_modal::<u8>().is_ok());
    }
}
