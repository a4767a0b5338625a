use crate::reorder::ReorderMethod;

/// Construction parameters of a [`Bdd`][crate::bdd::Bdd] manager.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Initial number of node slots. Rounded up to a prime.
    pub node_size: usize,
    /// Number of entries of each operation cache. Rounded up to a prime.
    pub cache_size: usize,
    /// Number of variables declared at construction.
    pub var_num: u32,
    /// Upper bound on the number of slots added by a single table growth.
    pub max_node_increase: usize,
    /// Upper bound on the node table size, `0` for no limit.
    pub max_node_size: usize,
    /// Minimum share of free slots (in percent) that a garbage collection must
    /// recover before the table is grown instead.
    pub min_free_nodes: usize,
    /// When positive, caches are resized to `node_size / cache_ratio` whenever the
    /// node table grows.
    pub cache_ratio: usize,
    /// Method used for automatic reordering, [`ReorderMethod::None`] to disable it.
    pub auto_reorder: ReorderMethod,
    /// Number of automatic reorderings allowed.
    pub auto_reorder_times: usize,
    /// Seed of [`ReorderMethod::Random`].
    pub random_seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            node_size: 10_000,
            cache_size: 10_000,
            var_num: 0,
            max_node_increase: 50_000,
            max_node_size: 0,
            min_free_nodes: 20,
            cache_ratio: 0,
            auto_reorder: ReorderMethod::None,
            auto_reorder_times: usize::MAX,
            random_seed: 42,
        }
    }
}

impl KernelConfig {
    pub fn with_node_size(mut self, node_size: usize) -> Self {
        self.node_size = node_size;
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_var_num(mut self, var_num: u32) -> Self {
        self.var_num = var_num;
        self
    }

    pub fn with_max_node_increase(mut self, max_node_increase: usize) -> Self {
        self.max_node_increase = max_node_increase;
        self
    }

    pub fn with_max_node_size(mut self, max_node_size: usize) -> Self {
        self.max_node_size = max_node_size;
        self
    }

    pub fn with_min_free_nodes(mut self, percent: usize) -> Self {
        assert!(percent <= 100, "min_free_nodes is a percentage, got {}", percent);
        self.min_free_nodes = percent;
        self
    }

    pub fn with_cache_ratio(mut self, cache_ratio: usize) -> Self {
        self.cache_ratio = cache_ratio;
        self
    }

    pub fn with_auto_reorder(mut self, method: ReorderMethod, times: usize) -> Self {
        self.auto_reorder = method;
        self.auto_reorder_times = times;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }
}
