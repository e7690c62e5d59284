//! 同じ PR の実行中ビルドを停止

use colored::Colorize;
use mlirci_config::Settings;
use mlirci_config::settings::PR_NUMBER;
use mlirci_remote::JenkinsClient;

pub async fn handle(settings: &Settings) -> anyhow::Result<()> {
    let pr = settings.require_pr_number()?;
    let job = settings.require_job_name()?;
    let number = settings.require_build_number()?;
    let token = settings.require_jenkins_token()?;

    let endpoints = &settings.endpoints;
    let jenkins = JenkinsClient::new(&endpoints.jenkins_url, &endpoints.jenkins_user, token);

    let stopped = jenkins
        .stop_previous_builds(job, number, PR_NUMBER, pr)
        .await?;

    if stopped.is_empty() {
        println!("{} 停止するビルドはありません", "-".yellow());
    }
    for build in stopped {
        println!(
            "{} {} #{} を停止しました ({})",
            "✓".green(),
            build.name,
            build.number,
            build.url
        );
    }

    Ok(())
}
