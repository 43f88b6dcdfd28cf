//! Field insertion: runs a sequence of `InsertionInstruction`s against the
//! focused control (§4.4 "Insertion modes" / "Insertion methods"), grounded
//! on the source agent's `FieldInserter`.

use std::sync::Arc;
use std::time::Duration;

use deskrelay_desktop::{DesktopError, DesktopIo};
use deskrelay_schema::{InsertMethod, InsertionInstruction, InsertionMode};

pub struct FieldInserter {
    desktop: Arc<dyn DesktopIo>,
    insert_delay_ms: u64,
}

impl FieldInserter {
    pub fn new(desktop: Arc<dyn DesktopIo>, insert_delay_ms: u64) -> Self {
        Self {
            desktop,
            insert_delay_ms,
        }
    }

    pub async fn insert_multiple(
        &self,
        instructions: &[InsertionInstruction],
        pause_before_ms: u64,
        pause_between_ms: u64,
    ) -> Result<(), DesktopError> {
        for (i, instruction) in instructions.iter().enumerate() {
            let pause = if i == 0 { pause_before_ms } else { pause_between_ms };
            self.insert(instruction, pause, pause_between_ms).await?;
        }
        self.desktop.release_modifiers().await
    }

    pub async fn insert(
        &self,
        instruction: &InsertionInstruction,
        pause_before_ms: u64,
        pause_after_ms: u64,
    ) -> Result<(), DesktopError> {
        tokio::time::sleep(Duration::from_millis(pause_before_ms)).await;

        if let Some(click) = &instruction.click_before {
            self.desktop.click(click.x, click.y).await?;
        }

        match instruction.mode {
            InsertionMode::Replace => self.replace_content(&instruction.content, instruction.insert_method).await?,
            InsertionMode::Append => self.append_content(&instruction.content, instruction.insert_method).await?,
            InsertionMode::Prepend => self.prepend_content(&instruction.content, instruction.insert_method).await?,
        }

        if let Some(navigation) = &instruction.navigation {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.navigate(navigation).await?;
        }

        tokio::time::sleep(Duration::from_millis(pause_after_ms)).await;
        Ok(())
    }

    async fn replace_content(&self, content: &str, method: InsertMethod) -> Result<(), DesktopError> {
        self.desktop.key_combo(&["ctrl".into(), "a".into()]).await?;
        self.desktop.key_combo(&["delete".into()]).await?;
        self.write_content(content, method).await
    }

    async fn append_content(&self, content: &str, method: InsertMethod) -> Result<(), DesktopError> {
        self.desktop.key_combo(&["ctrl".into(), "end".into()]).await?;
        self.write_content(&format!("\n{content}"), method).await
    }

    async fn prepend_content(&self, content: &str, method: InsertMethod) -> Result<(), DesktopError> {
        self.desktop.key_combo(&["ctrl".into(), "home".into()]).await?;
        self.write_content(&format!("{content}\n"), method).await
    }

    async fn write_content(&self, content: &str, method: InsertMethod) -> Result<(), DesktopError> {
        match method {
            InsertMethod::Paste => {
                let original = self.desktop.read_clipboard().await.ok();
                self.desktop.write_clipboard(content).await?;
                self.desktop.key_combo(&["ctrl".into(), "v".into()]).await?;
                if let Some(original) = original {
                    self.desktop.write_clipboard(&original).await?;
                }
                Ok(())
            }
            InsertMethod::Type => self.desktop.type_text(content, self.insert_delay_ms).await,
        }
    }

    /// Navigation commands: `tab_N`, `down_N`, or bare `enter` (§4.4).
    async fn navigate(&self, instruction: &str) -> Result<(), DesktopError> {
        if let Some(count) = instruction.strip_prefix("tab_") {
            return self.press_n_times("tab", count).await;
        }
        if let Some(count) = instruction.strip_prefix("down_") {
            return self.press_n_times("down", count).await;
        }
        if instruction == "enter" {
            return self.desktop.key_combo(&["enter".into()]).await;
        }
        Ok(())
    }

    async fn press_n_times(&self, key: &str, count: &str) -> Result<(), DesktopError> {
        let Ok(n) = count.parse::<u32>() else {
            return Ok(());
        };
        for _ in 0..n {
            self.desktop.key_combo(&[key.to_string()]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrelay_desktop::fake::FakeDesktopIo;
    use deskrelay_schema::InsertionType;

    fn instruction(mode: InsertionMode, method: InsertMethod, navigation: Option<&str>) -> InsertionInstruction {
        InsertionInstruction {
            target_field: "diagnosis".into(),
            content: "acute bronchitis".into(),
            mode,
            insertion_type: InsertionType::Text,
            navigation: navigation.map(str::to_string),
            label: None,
            click_before: None,
            insert_method: method,
        }
    }

    #[tokio::test]
    async fn replace_selects_all_then_pastes() {
        let desktop = Arc::new(FakeDesktopIo::with_clipboard("prior"));
        let inserter = FieldInserter::new(desktop.clone(), 0);
        inserter
            .insert(&instruction(InsertionMode::Replace, InsertMethod::Paste, None), 0, 0)
            .await
            .unwrap();

        assert!(desktop.key_combos().contains(&vec!["ctrl".to_string(), "a".to_string()]));
        assert_eq!(desktop.clipboard(), "prior");
    }

    #[tokio::test]
    async fn type_method_emits_keystrokes_without_touching_clipboard() {
        let desktop = Arc::new(FakeDesktopIo::with_clipboard("untouched"));
        let inserter = FieldInserter::new(desktop.clone(), 0);
        inserter
            .insert(&instruction(InsertionMode::Replace, InsertMethod::Type, None), 0, 0)
            .await
            .unwrap();

        assert_eq!(desktop.typed(), vec!["acute bronchitis".to_string()]);
        assert_eq!(desktop.clipboard(), "untouched");
    }

    #[tokio::test]
    async fn navigation_presses_tab_the_requested_number_of_times() {
        let desktop = Arc::new(FakeDesktopIo::default());
        let inserter = FieldInserter::new(desktop.clone(), 0);
        inserter
            .insert(&instruction(InsertionMode::Replace, InsertMethod::Type, Some("tab_3")), 0, 0)
            .await
            .unwrap();

        let tabs = desktop
            .key_combos()
            .into_iter()
            .filter(|c| c == &vec!["tab".to_string()])
            .count();
        assert_eq!(tabs, 3);
    }

    #[tokio::test]
    async fn insert_multiple_releases_modifiers_when_done() {
        let desktop = Arc::new(FakeDesktopIo::default());
        let inserter = FieldInserter::new(desktop.clone(), 0);
        let instructions = vec![instruction(InsertionMode::Replace, InsertMethod::Type, None)];
        inserter.insert_multiple(&instructions, 0, 0).await.unwrap();
        assert_eq!(desktop.modifiers_released(), 1);
    }
}
