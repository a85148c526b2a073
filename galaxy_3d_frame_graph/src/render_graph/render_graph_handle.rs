/// Handle to one version of a render graph resource.
///
/// `resource` indexes the graph's resource list, `node` its resource node
/// list. Writing a resource returns a new handle with the same `resource` and
/// a new `node`; handles are never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgHandle {
    pub resource: u32,
    pub node: u32,
}

impl RgHandle {
    pub const INVALID: RgHandle = RgHandle {
        resource: u32::MAX,
        node: u32::MAX,
    };

    pub fn is_valid(&self) -> bool {
        self.resource != u32::MAX && self.node != u32::MAX
    }
}

impl Default for RgHandle {
    fn default() -> Self {
        Self::INVALID
    }
}
