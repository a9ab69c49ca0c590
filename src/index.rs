// ABOUTME: Maps declared image references to the services that run them.
// ABOUTME: Built once at startup and shared read-only across requests.

use nonempty::NonEmpty;
use std::collections::HashMap;
use std::sync::Arc;

use crate::compile::CompiledService;

/// Image reference, exactly as declared, to the services declaring it in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    by_image: HashMap<String, NonEmpty<Arc<CompiledService>>>,
}

impl ImageIndex {
    pub fn new(services: &[CompiledService]) -> Self {
        let mut by_image: HashMap<String, NonEmpty<Arc<CompiledService>>> = HashMap::new();
        for service in services {
            let image = service.service.image.to_string();
            let service = Arc::new(service.clone());
            match by_image.get_mut(&image) {
                Some(group) => group.push(service),
                None => {
                    by_image.insert(image, NonEmpty::new(service));
                }
            }
        }
        Self { by_image }
    }

    /// Services declaring exactly `image`, or none.
    pub fn resolve(&self, image: &str) -> Option<&NonEmpty<Arc<CompiledService>>> {
        self.by_image.get(image)
    }

    /// Number of distinct image references.
    pub fn len(&self) -> usize {
        self.by_image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_image.is_empty()
    }
}
