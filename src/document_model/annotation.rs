use super::locator::MatchCandidate;
use super::pin_registry::PinId;
use super::tree::{DocumentTree, Marker, Node, NodeId, TreeError};

/// Split the candidate's leaf into `[before?, marker, after?]` in place.
///
/// The unhighlighted parts become fragments tagged with the leaf they came
/// from, so removal can rejoin exactly those pieces. Returns the id of the
/// new marker. The leaf id is no longer valid afterwards.
pub fn apply_highlight<T: DocumentTree + ?Sized>(
    tree: &mut T,
    candidate: &MatchCandidate,
    category: &str,
    pin_id: Option<PinId>,
) -> Result<NodeId, TreeError> {
    let leaf = candidate.leaf;
    let (raw, origin) = match tree.node(leaf) {
        Some(Node::Text(text)) => (text, leaf),
        Some(Node::Fragment { text, origin }) => (text, *origin),
        Some(_) => return Err(TreeError::NotALeaf(leaf)),
        None => return Err(TreeError::UnknownNode(leaf)),
    };

    let (start, end) = (candidate.raw_start, candidate.raw_end());
    let in_bounds = start < end
        && end <= raw.len()
        && raw.is_char_boundary(start)
        && raw.is_char_boundary(end);
    if !in_bounds {
        return Err(TreeError::EmptySpan { start, end });
    }

    let fragment = |text: &str| Node::Fragment {
        text: text.to_string(),
        origin,
    };
    let before = &raw[..start];
    let after = &raw[end..];
    let marker = Node::Marker(Marker {
        text: raw[start..end].to_string(),
        category: category.to_string(),
        pin_id,
        origin: Some(origin),
    });

    let marker_pos = usize::from(!before.is_empty());
    let mut parts = Vec::with_capacity(3);
    if !before.is_empty() {
        parts.push(fragment(before));
    }
    parts.push(marker);
    if !after.is_empty() {
        parts.push(fragment(after));
    }

    let ids = tree.replace(&[leaf], parts)?;
    Ok(ids[marker_pos])
}

/// Fold a marker back into plain text, merging it with the adjacent
/// fragments cut from the same leaf. Returns the restored node: a `Text`
/// leaf once nothing else from that leaf is still highlighted, otherwise a
/// fragment.
pub fn remove_highlight<T: DocumentTree + ?Sized>(
    tree: &mut T,
    marker: NodeId,
) -> Result<NodeId, TreeError> {
    let (marked_text, origin) = match tree.node(marker) {
        Some(Node::Marker(m)) => (m.text.clone(), m.origin),
        Some(_) => return Err(TreeError::NotAMarker(marker)),
        None => return Err(TreeError::UnknownNode(marker)),
    };

    let same_origin = |id: NodeId| {
        origin.is_some() && tree.node(id).and_then(Node::origin) == origin
    };
    let sibling_fragment = |id: Option<NodeId>| {
        id.filter(|id| same_origin(*id))
            .and_then(|id| match tree.node(id) {
                Some(Node::Fragment { text, .. }) => Some((id, text.clone())),
                _ => None,
            })
    };
    let before = sibling_fragment(tree.prev_sibling(marker));
    let after = sibling_fragment(tree.next_sibling(marker));

    let mut targets = Vec::with_capacity(3);
    let mut merged = String::new();
    if let Some((id, text)) = before {
        targets.push(id);
        merged.push_str(&text);
    }
    targets.push(marker);
    merged.push_str(&marked_text);
    if let Some((id, text)) = after {
        targets.push(id);
        merged.push_str(&text);
    }

    // Another marker from the same leaf may still sit just outside the run
    let first = targets[0];
    let last = targets[targets.len() - 1];
    let still_split = [tree.prev_sibling(first), tree.next_sibling(last)]
        .into_iter()
        .flatten()
        .any(same_origin);

    let restored = match origin {
        Some(origin) if still_split => Node::Fragment {
            text: merged,
            origin,
        },
        _ => Node::Text(merged),
    };
    let ids = tree.replace(&targets, vec![restored])?;
    ids.first().copied().ok_or(TreeError::NotSiblings)
}

/// Text of the original leaf a marker or fragment was cut from, rebuilt from
/// the contiguous run of siblings sharing its origin.
pub fn origin_text<T: DocumentTree + ?Sized>(tree: &T, id: NodeId) -> Option<String> {
    let origin = tree.node(id)?.origin()?;
    let siblings = tree.children(tree.parent(id)?);
    let pos = siblings.iter().position(|sibling| *sibling == id)?;
    let shares_origin = |sibling: &&NodeId| {
        tree.node(**sibling).and_then(Node::origin) == Some(origin)
    };

    let start = pos - siblings[..pos].iter().rev().take_while(shares_origin).count();
    let end = pos + 1 + siblings[pos + 1..].iter().take_while(shares_origin).count();
    Some(
        siblings[start..end]
            .iter()
            .filter_map(|sibling| tree.node(*sibling).and_then(Node::text))
            .collect(),
    )
}
