use super::Condition;

/// Fans a condition out into one lookup per identity.
#[derive(Debug, Clone)]
pub struct SplitByMetricNames {
    condition: Condition,
}

/// One identity of a split condition, borrowed from its parent.
#[derive(Debug, Clone, Copy)]
pub struct MetricSplit<'a> {
    condition: &'a Condition,
    uuid: &'a [u8],
}

impl SplitByMetricNames {
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn iter(&self) -> impl Iterator<Item = MetricSplit<'_>> {
        self.condition
            .uuids()
            .iter()
            .map(move |uuid| MetricSplit {
                condition: &self.condition,
                uuid: uuid.as_slice(),
            })
    }

    pub fn len(&self) -> usize {
        self.condition.uuids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.condition.uuids().is_empty()
    }
}

impl<'a> MetricSplit<'a> {
    pub fn current_uuid(&self) -> &'a [u8] {
        self.uuid
    }

    pub fn condition(&self) -> &'a Condition {
        self.condition
    }
}
