use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::debug;
use ndarray::{Array2, ArrayView2};

use super::decomposer::{decompose, Decomposition};
use super::error::Result;

/// Hash of a matrix's shape and the bit pattern of every element.
pub fn content_key(matrix: &ArrayView2<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    matrix.dim().hash(&mut hasher);
    for v in matrix.iter() {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Memoizes decompositions per matrix and reconstructions per `(matrix, rank)`.
///
/// Holds at most `capacity` entries of each kind; the oldest is evicted first.
/// Dropping a decomposition also drops the reconstructions derived from it.
pub struct ReconstructionCache {
    capacity: usize,
    decompositions: HashMap<u64, Arc<Decomposition>>,
    decomposition_order: VecDeque<u64>,
    reconstructions: HashMap<(u64, usize), Arc<Array2<f64>>>,
    reconstruction_order: VecDeque<(u64, usize)>,
}

impl ReconstructionCache {
    pub fn new(capacity: usize) -> Self {
        ReconstructionCache {
            capacity: capacity.max(1),
            decompositions: HashMap::new(),
            decomposition_order: VecDeque::new(),
            reconstructions: HashMap::new(),
            reconstruction_order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.reconstructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reconstructions.is_empty()
    }

    pub fn decomposition_count(&self) -> usize {
        self.decompositions.len()
    }

    pub fn decomposition(&mut self, matrix: &ArrayView2<f64>) -> Result<Arc<Decomposition>> {
        let key = content_key(matrix);
        self.decomposition_for_key(key, matrix)
    }

    pub fn reconstruction(
        &mut self,
        matrix: &ArrayView2<f64>,
        rank: usize,
    ) -> Result<Arc<Array2<f64>>> {
        let key = content_key(matrix);
        if let Some(hit) = self.reconstructions.get(&(key, rank)) {
            debug!("reconstruction cache hit: key={:016x} rank={}", key, rank);
            return Ok(Arc::clone(hit));
        }
        debug!("reconstruction cache miss: key={:016x} rank={}", key, rank);
        let decomposition = self.decomposition_for_key(key, matrix)?;
        let approx = Arc::new(decomposition.reconstruct(rank)?);
        self.insert_reconstruction((key, rank), Arc::clone(&approx));
        Ok(approx)
    }

    /// Returns the reconstruction for each of `ranks`, in order, computing the
    /// uncached ones in one parallel batch.
    ///
    /// The returned `Arc`s stay valid even when the batch is larger than the
    /// cache and some of them are evicted right away.
    pub fn prefetch(
        &mut self,
        matrix: &ArrayView2<f64>,
        ranks: &[usize],
    ) -> Result<Vec<Arc<Array2<f64>>>> {
        let key = content_key(matrix);
        let mut missing: Vec<usize> = ranks
            .iter()
            .copied()
            .filter(|rank| !self.reconstructions.contains_key(&(key, *rank)))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        let mut computed: HashMap<usize, Arc<Array2<f64>>> = HashMap::new();
        if !missing.is_empty() {
            let decomposition = self.decomposition_for_key(key, matrix)?;
            debug!("prefetching {} ranks for key={:016x}", missing.len(), key);
            let batch = decomposition.reconstruct_many(&missing)?;
            computed = missing.into_iter().zip(batch.into_iter().map(Arc::new)).collect();
        }

        // Collect before inserting: insertion may evict entries requested here.
        let out: Vec<Arc<Array2<f64>>> = ranks
            .iter()
            .map(|rank| match self.reconstructions.get(&(key, *rank)) {
                Some(hit) => Arc::clone(hit),
                None => Arc::clone(&computed[rank]),
            })
            .collect();
        for rank in ranks {
            if let Some(approx) = computed.remove(rank) {
                self.insert_reconstruction((key, *rank), approx);
            }
        }
        Ok(out)
    }

    fn decomposition_for_key(
        &mut self,
        key: u64,
        matrix: &ArrayView2<f64>,
    ) -> Result<Arc<Decomposition>> {
        if let Some(hit) = self.decompositions.get(&key) {
            debug!("decomposition cache hit: key={:016x}", key);
            return Ok(Arc::clone(hit));
        }
        debug!("decomposition cache miss: key={:016x}", key);
        let decomposition = Arc::new(decompose(matrix)?);

        self.decompositions.insert(key, Arc::clone(&decomposition));
        self.decomposition_order.push_back(key);
        while self.decomposition_order.len() > self.capacity {
            if let Some(old) = self.decomposition_order.pop_front() {
                self.decompositions.remove(&old);
                self.reconstructions.retain(|(k, _), _| *k != old);
                self.reconstruction_order.retain(|(k, _)| *k != old);
            }
        }
        Ok(decomposition)
    }

    fn insert_reconstruction(&mut self, key: (u64, usize), approx: Arc<Array2<f64>>) {
        if self.reconstructions.insert(key, approx).is_none() {
            self.reconstruction_order.push_back(key);
        }
        while self.reconstruction_order.len() > self.capacity {
            if let Some(old) = self.reconstruction_order.pop_front() {
                self.reconstructions.remove(&old);
            }
        }
    }
}
