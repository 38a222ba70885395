use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Why one plugin's task in a transition did not succeed.
#[derive(Debug, Clone)]
pub enum TaskFailure {
    /// The plugin's own handler or listener failed.
    Failed {
        plugin: String,
        cause: Arc<anyhow::Error>,
    },
    /// A predecessor failed, so this plugin's work was skipped.
    Upstream {
        plugin: String,
        dependency: String,
        cause: Arc<anyhow::Error>,
    },
}

impl TaskFailure {
    pub fn plugin(&self) -> &str {
        match self {
            Self::Failed { plugin, .. } | Self::Upstream { plugin, .. } => plugin,
        }
    }

    /// The underlying cause; for a skip, the predecessor's cause.
    pub fn cause(&self) -> &Arc<anyhow::Error> {
        match self {
            Self::Failed { cause, .. } | Self::Upstream { cause, .. } => cause,
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { plugin, cause } => write!(f, "{plugin}: {cause:#}"),
            Self::Upstream {
                plugin,
                dependency,
                cause,
            } => write!(f, "{plugin}: skipped, dependency '{dependency}' failed: {cause:#}"),
        }
    }
}

impl std::error::Error for TaskFailure {}

/// Every distinct cause collected from one gathered group of tasks.
#[derive(Debug, Clone)]
pub struct AggregateError {
    causes: Vec<Arc<anyhow::Error>>,
}

impl AggregateError {
    /// Collect `causes`, skipping repeats of the same cause and splicing in
    /// the causes of any nested `AggregateError`.
    pub fn from_causes<I>(causes: I) -> Self
    where
        I: IntoIterator<Item = Arc<anyhow::Error>>,
    {
        let mut collected: Vec<Arc<anyhow::Error>> = Vec::new();
        for cause in causes {
            let flattened = match cause.downcast_ref::<AggregateError>() {
                Some(nested) => nested.causes.clone(),
                None => vec![cause],
            };
            for cause in flattened {
                if !collected.iter().any(|seen| Arc::ptr_eq(seen, &cause)) {
                    collected.push(cause);
                }
            }
        }
        Self { causes: collected }
    }

    pub fn causes(&self) -> &[Arc<anyhow::Error>] {
        &self.causes
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.causes.len())?;
        for cause in &self.causes {
            write!(f, "; {cause:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Wait for every future and return their outputs in input order.
///
/// Never short-circuits: a failed entry does not stop the others from being
/// awaited.
pub async fn gather<I>(futures: I) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future,
{
    futures::future::join_all(futures).await
}

/// Fold gathered task results into one outcome.
///
/// Succeeds with every value when no entry failed; otherwise fails with the
/// distinct causes of all failed entries, task wrappers removed.
pub fn to_aggregate_outcome<T>(
    results: impl IntoIterator<Item = Result<T, TaskFailure>>,
) -> Result<Vec<T>, AggregateError> {
    let mut values = Vec::new();
    let mut causes = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(failure) => causes.push(failure.cause().clone()),
        }
    }

    if causes.is_empty() {
        Ok(values)
    } else {
        Err(AggregateError::from_causes(causes))
    }
}
