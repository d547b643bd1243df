//! Typed state slots on top of the generic store.

use engine::{Budget, Category, DateRange, Expense, FilterSpec, Money};
use serde::{Deserialize, Serialize};
use store::Store;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKey {
    Expenses,
    Filters,
    Settings,
    Budgets,
    CurrentView,
    IsLoading,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateValue {
    Expenses(Vec<Expense>),
    Filters(FilterSpec),
    Settings(Settings),
    Budgets(Vec<Budget>),
    CurrentView(String),
    IsLoading(bool),
}

impl StateValue {
    pub fn key(&self) -> StateKey {
        match self {
            Self::Expenses(_) => StateKey::Expenses,
            Self::Filters(_) => StateKey::Filters,
            Self::Settings(_) => StateKey::Settings,
            Self::Budgets(_) => StateKey::Budgets,
            Self::CurrentView(_) => StateKey::CurrentView,
            Self::IsLoading(_) => StateKey::IsLoading,
        }
    }
}

/// User preferences, persisted next to the expenses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub currency: String,
    /// Used by `add` when no category is given.
    pub default_category: Category,
    /// Date range the expense list starts with.
    pub default_range: DateRange,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "€".to_string(),
            default_category: Category::Other,
            default_range: DateRange::All,
        }
    }
}

/// Everything read from persistence at startup.
#[derive(Clone, Debug, Default)]
pub struct Loaded {
    pub expenses: Vec<Expense>,
    pub settings: Settings,
    pub budgets: Vec<Budget>,
}

#[derive(Debug)]
pub enum Removal {
    Removed(Expense),
    NotFound,
    /// More than one identifier starts with the given prefix.
    Ambiguous(usize),
}

pub type AppStore = Store<StateKey, StateValue>;

/// Application state: one store, read and written through typed helpers.
#[derive(Clone, Debug)]
pub struct AppState {
    store: AppStore,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Empty state, flagged as loading until [`AppState::load`] runs.
    pub fn new() -> Self {
        let initial = [
            StateValue::Expenses(Vec::new()),
            StateValue::Filters(FilterSpec::default()),
            StateValue::Settings(Settings::default()),
            StateValue::Budgets(Vec::new()),
            StateValue::CurrentView(String::new()),
            StateValue::IsLoading(true),
        ];
        Self {
            store: Store::new(initial.map(|value| (value.key(), value))),
        }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    /// Installs persisted data in one batch and clears the loading flag.
    pub fn load(&self, loaded: Loaded) {
        let filters = FilterSpec {
            date_range: loaded.settings.default_range,
            ..self.filters()
        };
        let updates = [
            StateValue::Expenses(loaded.expenses),
            StateValue::Settings(loaded.settings),
            StateValue::Budgets(loaded.budgets),
            StateValue::Filters(filters),
            StateValue::IsLoading(false),
        ];
        self.store
            .batch_update(updates.map(|value| (value.key(), value)));
    }

    fn set(&self, value: StateValue) {
        self.store.set_state(value.key(), value);
    }

    fn read<T>(&self, key: StateKey, pick: impl FnOnce(&StateValue) -> Option<T>) -> Option<T> {
        self.store.get(&key).and_then(|value| pick(&value))
    }

    pub fn expenses(&self) -> Vec<Expense> {
        self.read(StateKey::Expenses, |value| match value {
            StateValue::Expenses(list) => Some(list.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn filters(&self) -> FilterSpec {
        self.read(StateKey::Filters, |value| match value {
            StateValue::Filters(filters) => Some(filters.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn settings(&self) -> Settings {
        self.read(StateKey::Settings, |value| match value {
            StateValue::Settings(settings) => Some(settings.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn budgets(&self) -> Vec<Budget> {
        self.read(StateKey::Budgets, |value| match value {
            StateValue::Budgets(budgets) => Some(budgets.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn current_view(&self) -> String {
        self.read(StateKey::CurrentView, |value| match value {
            StateValue::CurrentView(view) => Some(view.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.read(StateKey::IsLoading, |value| match value {
            StateValue::IsLoading(loading) => Some(*loading),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub fn set_view(&self, view: &str) {
        self.set(StateValue::CurrentView(view.to_string()));
    }

    pub fn add_expense(&self, expense: Expense) {
        let mut expenses = self.expenses();
        expenses.push(expense);
        self.set(StateValue::Expenses(expenses));
    }

    /// Removes the single expense whose id starts with `id_prefix`.
    pub fn remove_expense(&self, id_prefix: &str) -> Removal {
        let mut expenses = self.expenses();
        let matches: Vec<usize> = expenses
            .iter()
            .enumerate()
            .filter(|(_, expense)| expense.id.starts_with(id_prefix))
            .map(|(position, _)| position)
            .collect();

        match matches.as_slice() {
            [] => Removal::NotFound,
            [position] => {
                let removed = expenses.remove(*position);
                self.set(StateValue::Expenses(expenses));
                Removal::Removed(removed)
            }
            many => Removal::Ambiguous(many.len()),
        }
    }

    /// Applies `change` to the filters. Returns `false`, without notifying
    /// anyone, when the result equals the current filters.
    pub fn update_filters(&self, change: impl FnOnce(&mut FilterSpec)) -> bool {
        let current = self.filters();
        let mut next = current.clone();
        change(&mut next);
        if next == current {
            return false;
        }
        self.set(StateValue::Filters(next));
        true
    }

    pub fn update_settings(&self, change: impl FnOnce(&mut Settings)) {
        let mut settings = self.settings();
        change(&mut settings);
        self.set(StateValue::Settings(settings));
    }

    /// Sets the monthly limit of `category`; a zero limit removes the budget.
    pub fn set_budget(&self, category: Category, limit: Money) {
        let mut budgets = self.budgets();
        budgets.retain(|budget| budget.category != category);
        if !limit.is_zero() {
            budgets.push(Budget { category, limit });
            budgets.sort_by_key(|budget| budget.category);
        }
        self.set(StateValue::Budgets(budgets));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::Utc;
    use engine::CategoryFilter;

    use super::*;

    fn expense(id: &str, cents: i64) -> Expense {
        Expense {
            id: id.to_string(),
            amount: Money::new(cents),
            category: Category::Food,
            description: String::new(),
            date: Utc::now(),
        }
    }

    #[test]
    fn starts_loading_with_empty_slots() {
        let state = AppState::new();
        assert!(state.is_loading());
        assert!(state.expenses().is_empty());
        assert_eq!(state.settings(), Settings::default());
        assert_eq!(state.current_view(), "");
    }

    #[test]
    fn load_is_one_wildcard_notification() {
        let state = AppState::new();
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notifications);
        let _all = state.store().subscribe_all(move |_, change| {
            assert!(change.is_batch());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        state.load(Loaded {
            expenses: vec![expense("a", 100)],
            settings: Settings {
                default_range: DateRange::Month,
                ..Settings::default()
            },
            budgets: Vec::new(),
        });

        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert!(!state.is_loading());
        assert_eq!(state.expenses().len(), 1);
        assert_eq!(state.filters().date_range, DateRange::Month);
    }

    #[test]
    fn remove_by_prefix() {
        let state = AppState::new();
        state.add_expense(expense("abc1", 100));
        state.add_expense(expense("abc2", 200));
        state.add_expense(expense("xyz", 300));

        assert!(matches!(state.remove_expense("abc"), Removal::Ambiguous(2)));
        assert!(matches!(state.remove_expense("nope"), Removal::NotFound));
        match state.remove_expense("abc2") {
            Removal::Removed(removed) => assert_eq!(removed.amount, Money::new(200)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(state.expenses().len(), 2);
    }

    #[test]
    fn unchanged_filters_do_not_notify() {
        let state = AppState::new();
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notifications);
        let _sub = state.store().subscribe(StateKey::Filters, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!state.update_filters(|filters| filters.category = CategoryFilter::All));
        assert!(state.update_filters(|filters| {
            filters.category = CategoryFilter::Only(Category::Bills);
        }));
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn budgets_are_replaced_and_removed() {
        let state = AppState::new();
        state.set_budget(Category::Food, Money::from_major(200));
        state.set_budget(Category::Bills, Money::from_major(100));
        state.set_budget(Category::Food, Money::from_major(250));
        assert_eq!(
            state.budgets(),
            vec![
                Budget {
                    category: Category::Food,
                    limit: Money::from_major(250)
                },
                Budget {
                    category: Category::Bills,
                    limit: Money::from_major(100)
                },
            ]
        );

        state.set_budget(Category::Food, Money::ZERO);
        assert_eq!(state.budgets().len(), 1);
    }
}
