//! Walk through the full submission flow with the development credentials.
//! Nothing is stored or charged.
//!
//! BLACKBOX_BASE_URL points the demo at another deployment.

use blackbox_sdk::{default_client, Result, Session, DEV_USER_ID};
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🎬 Blackbox submission flow (dev mode)\n");

    let client = default_client()?;
    println!("✅ Client ready: {}", client.base_url());

    // Step 1: resolve a session
    println!("\n🔎 Looking up sessions for {}...", DEV_USER_ID);
    let session = match client.create(DEV_USER_ID).await {
        Ok(session) => {
            println!("   ✅ Session: {}", session.session_id);
            session
        }
        Err(e) => {
            println!("   ⚠️ Create failed ({}), using built-in dev session", e);
            Session::dev()
        }
    };

    // Step 2: upload a small asset
    println!("\n📤 Uploading treatment...");
    let treatment = b"Logline: a lighthouse keeper paints the storms she cannot stop.".to_vec();
    match client.upload(&session, treatment).await {
        Ok(()) => println!("   ✅ Uploaded"),
        Err(e) => println!("   ❌ Upload failed: {}", e),
    }

    // Step 3: tee a reader into an upload while consuming it
    println!("\n🔗 Attaching to a reader...");
    let notes = &b"Palette: slate, amber, bone white."[..];
    let mut attached = client.attach(&session, notes);
    let upload = attached.take_upload();

    let mut local = Vec::new();
    if let Err(e) = attached.read_to_end(&mut local).await {
        println!("   ❌ Read failed: {}", e);
    }
    println!("   Read locally: {}", String::from_utf8_lossy(&local));

    if let Some(upload) = upload {
        match upload.wait().await {
            Ok(()) => println!("   ✅ Attached upload done"),
            Err(e) => println!("   ❌ Attached upload failed: {}", e),
        }
    }

    // Step 4: finalize
    println!("\n📨 Finalizing...");
    match client.finalize(&session, 10 * 100).await {
        Ok(()) => println!("   ✅ Submitted for review"),
        Err(e) => println!("   ❌ Finalize failed: {}", e),
    }

    println!("\n✨ Flow complete!");
    Ok(())
}
