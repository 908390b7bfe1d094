use crate::state::AppState;

pub async fn cmd_models(state: &AppState) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let settings = state.chat.settings_for(&user.id).await?;

    let models = state.chat.list_models(&settings).await?;

    if models.is_empty() {
        println!("No models available for this API key.");
        return Ok(());
    }

    println!("Available models ({} total)", models.len());
    println!("{:-<40}", "");

    for model in &models {
        let marker = if model.id == settings.selected_model {
            "*"
        } else {
            " "
        };
        println!("{marker} {}", model.display_name);
    }

    println!();
    println!("* selected. Change with: chatkeep settings set model <id>");
    Ok(())
}
