//! Want/have comparison that produces device commands.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::modules::State;
use crate::parser::NetworkTemplate;
use crate::value::{ConfigMap, ConfigValue};

/// Accumulates the commands that converge `have` onto `want` for one
/// resource invocation.
///
/// The generic primitive is [`compare`](Self::compare), a rule-by-rule scan
/// of two trees. Resources extend it with keyed-list reconciliation and
/// context blocks, always appending to the same ordered command buffer.
#[derive(Debug)]
pub struct ResourceModule<'t> {
    template: &'t NetworkTemplate,
    state: State,
    commands: Vec<String>,
}

impl<'t> ResourceModule<'t> {
    pub fn new(template: &'t NetworkTemplate, state: State) -> Self {
        Self {
            template,
            state,
            commands: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn template(&self) -> &'t NetworkTemplate {
        self.template
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<String> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Render `rule` from `data` and append it
    pub fn addcmd(&mut self, data: &ConfigValue, rule: &str, negate: bool) -> Result<()> {
        if let Some(command) = self.template.render(data, rule, negate)? {
            debug!(rule, negate, command = %command, "generated command");
            self.commands.push(command);
        }
        Ok(())
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.commands.push(command.into());
    }

    pub fn insert(&mut self, index: usize, command: impl Into<String>) {
        self.commands.insert(index, command.into());
    }

    /// Compare `want` and `have` along each rule's compared path.
    ///
    /// * equal values (both absent included) produce nothing
    /// * a `want` value differing from `have` is rendered from `want`; a
    ///   boolean renders negated when `false`
    /// * a value only in `have` is removed by rendering it negated from
    ///   `have`, unless the state keeps unspecified configuration; a
    ///   `false` boolean is removed by rendering it positive
    pub fn compare(&mut self, rules: &[&str], want: &ConfigValue, have: &ConfigValue) -> Result<()> {
        for &name in rules {
            let path = match self.template.rule(name) {
                Some(rule) => rule.compval(),
                None => name,
            };
            let inw = want.get_path(path);
            let inh = have.get_path(path);

            match (inw, inh) {
                (Some(w), h) if Some(w) != h => match w.as_bool() {
                    Some(flag) => self.addcmd(want, name, !flag)?,
                    None => self.addcmd(want, name, false)?,
                },
                (None, Some(h)) if self.state.removes_unspecified() => match h.as_bool() {
                    Some(flag) => self.addcmd(have, name, flag)?,
                    None => self.addcmd(have, name, true)?,
                },
                _ => {}
            }
        }
        Ok(())
    }

    /// Run `body` and put `header` in front of whatever it generated.
    ///
    /// Nothing is inserted when `body` produced no commands. Returns whether
    /// the header was inserted.
    pub fn in_context<F>(&mut self, header: impl Into<String>, body: F) -> Result<bool>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.in_contexts(vec![header.into()], false, body)
    }

    /// Like [`in_context`](Self::in_context) with several nested headers.
    ///
    /// With `always` set the headers are emitted even when `body` produced
    /// nothing, for headers that are configuration in their own right.
    pub fn in_contexts<F>(&mut self, headers: Vec<String>, always: bool, body: F) -> Result<bool>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let begin = self.commands.len();
        body(self)?;
        if self.commands.len() == begin && !always {
            return Ok(false);
        }
        let body_commands = self.commands.split_off(begin);
        self.commands.extend(headers);
        self.commands.extend(body_commands);
        Ok(true)
    }

    /// Reconcile two keyed collections.
    ///
    /// `f` is called with each `want` entry and its `have` counterpart (an
    /// empty map when missing), in `want` order. With `remove_unmatched`
    /// set, `f` is then called with an empty `want` for each `have` entry
    /// that `want` does not name.
    pub fn compare_keyed<F>(
        &mut self,
        want: &ConfigMap,
        have: &ConfigMap,
        remove_unmatched: bool,
        mut f: F,
    ) -> Result<()>
    where
        F: FnMut(&mut Self, &ConfigValue, &ConfigValue) -> Result<()>,
    {
        let empty = ConfigValue::empty_map();
        let mut leftover: IndexMap<&str, &ConfigValue> =
            have.iter().map(|(k, v)| (k.as_str(), v)).collect();

        for (key, wentry) in want {
            let hentry = leftover.shift_remove(key.as_str()).unwrap_or(&empty);
            f(self, wentry, hentry)?;
        }

        if remove_unmatched {
            for hentry in leftover.values() {
                f(self, &empty, hentry)?;
            }
        }
        Ok(())
    }

    /// Reconcile a keyed list whose entries each render as one command.
    ///
    /// Changed or new entries are rendered from `want`; entries only in
    /// `have` are negated afterwards when the state removes unspecified
    /// configuration.
    pub fn compare_list_entries(&mut self, rule: &str, want: &ConfigMap, have: &ConfigMap) -> Result<()> {
        for (key, wentry) in want {
            if have.get(key) != Some(wentry) {
                self.addcmd(wentry, rule, false)?;
            }
        }
        if self.state.removes_unspecified() {
            for (key, hentry) in have {
                if !want.contains_key(key) {
                    self.addcmd(hentry, rule, true)?;
                }
            }
        }
        Ok(())
    }
}
