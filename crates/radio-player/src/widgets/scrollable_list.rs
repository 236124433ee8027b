//! Scrollable list over a filtered view of its items.  Filtering only
//! recomputes `visible`; `items` is never reordered or trimmed.

pub type FilterFn<T> = fn(&[T], &str) -> Vec<usize>;

pub struct ScrollableList<T> {
    pub items: Vec<T>,
    /// Indices into `items`, in display order.
    pub visible: Vec<usize>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub filter: String,
    filter_fn: FilterFn<T>,
}

impl<T> ScrollableList<T> {
    pub fn new(filter_fn: FilterFn<T>) -> Self {
        Self {
            items: Vec::new(),
            visible: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            filter_fn,
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.rebuild();
    }

    /// Keeps the same item selected when it survives the new filter.
    pub fn set_filter(&mut self, query: &str) {
        let previous = self.selected_original_index();
        self.filter = query.to_string();
        self.rebuild();
        self.selected = previous
            .and_then(|prev| self.visible.iter().position(|&i| i == prev))
            .unwrap_or(0);
        self.scroll_offset = 0;
    }

    fn rebuild(&mut self) {
        self.visible = (self.filter_fn)(&self.items, &self.filter);
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.visible.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(*self.visible.get(self.selected)?)
    }

    pub fn selected_original_index(&self) -> Option<usize> {
        self.visible.get(self.selected).copied()
    }

    pub fn set_selected_by_original(&mut self, orig_idx: usize) {
        if let Some(pos) = self.visible.iter().position(|&i| i == orig_idx) {
            self.selected = pos;
        }
    }

    /// `(original index, item)` pairs for the rows that fit in `height`.
    /// Call `ensure_visible` first.
    pub fn visible_items(&self, height: usize) -> Vec<(usize, &T)> {
        let end = (self.scroll_offset + height).min(self.visible.len());
        self.visible
            .get(self.scroll_offset..end)
            .unwrap_or(&[])
            .iter()
            .map(|&i| (i, &self.items[i]))
            .collect()
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// Select the row under a click.  Returns true when `row` hit an item.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.visible.len() {
            self.selected = target;
            true
        } else {
            false
        }
    }

    pub fn selected_in_view(&self) -> usize {
        self.selected.saturating_sub(self.scroll_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
