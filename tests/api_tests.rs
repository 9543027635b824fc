// tests/api_tests.rs

mod common;

use axum::http::{Method, StatusCode};
use common::{PASSWORD, TestApp};
use serde_json::json;

#[tokio::test]
async fn unknown_path_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(Method::GET, "/random_path_that_does_not_exist", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_rejects_bad_password() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": common::ADMIN_EMAIL, "password": "nope" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn login_returns_bearer_token_and_role() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ADMIN@school.test", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["role"], "admin");

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.get("/api/v1/users/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], common::ADMIN_EMAIL);
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn missing_or_bad_token_is_401() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/v1/exams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");

    let (status, _) = app.get("/api/v1/exams", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_are_enforced() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;

    let (status, _) = app.get("/api/v1/users", &student).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/v1/exams",
            &student,
            json!({
                "name": "Sneaky",
                "description": "Not allowed",
                "duration": 10,
                "examDate": "2026-12-01",
                "examTime": "10:00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/exam-results", &teacher).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/questions", &student).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let exam_id = app.exam(&teacher, 30).await;
    let (status, _) = app
        .post(
            &format!("/api/v1/students/exam/{}/write", exam_id),
            &teacher,
            json!({ "answers": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_lists_users_by_role() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.user(&admin, "tina", "teacher").await;
    app.user(&admin, "sam", "student").await;
    app.user(&admin, "sue", "student").await;

    let (status, body) = app.get("/api/v1/users?role=student", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app
        .post(
            "/api/v1/users",
            &admin,
            json!({ "name": "sam", "email": "sam@school.test", "password": PASSWORD, "role": "student" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email 'sam@school.test' is already registered");
}

#[tokio::test]
async fn exam_validation() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;

    let base = json!({
        "name": "Geometry",
        "description": "Angles",
        "duration": 40,
        "examDate": "2026-12-01",
        "examTime": "13:15",
    });

    let mut over = base.clone();
    over["passMark"] = json!(120);
    over["totalMark"] = json!(100);
    let (status, body) = app.post("/api/v1/exams", &teacher, over).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");

    let mut bad_time = base.clone();
    bad_time["examTime"] = json!("1pm");
    let (status, _) = app.post("/api/v1/exams", &teacher, bad_time).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, exam) = app.post("/api/v1/exams", &teacher, base).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(exam["examType"], "quiz");
    assert_eq!(exam["status"], "pending");
    assert_eq!(exam["passMark"], 50);

    let id = exam["id"].as_i64().unwrap();
    let (status, _) = app
        .patch(&format!("/api/v1/exams/{}", id), &teacher, json!({ "passMark": 150 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .patch(
            &format!("/api/v1/exams/{}", id),
            &teacher,
            json!({ "duration": 50, "status": "live" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["duration"], 50);
    assert_eq!(updated["status"], "live");
    assert_eq!(updated["name"], "Geometry");
}

#[tokio::test]
async fn only_the_owner_edits_an_exam() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let owner = app.user(&admin, "tina", "teacher").await;
    let other = app.user(&admin, "tom", "teacher").await;
    let exam_id = app.exam(&owner, 30).await;

    let (status, _) = app
        .patch(&format!("/api/v1/exams/{}", exam_id), &other, json!({ "duration": 5 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/api/v1/questions/{}", exam_id),
            &other,
            json!({
                "question": "2 + 2?",
                "optionA": "3", "optionB": "4", "optionC": "5", "optionD": "22",
                "correctAnswer": "optionB"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(&format!("/api/v1/exams/{}", exam_id), &admin, json!({ "duration": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/exams/9999", &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn students_never_see_the_answer_key() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;
    let q1 = app.question(&teacher, exam_id, "optionB").await;
    let q2 = app.question(&teacher, exam_id, "optionD").await;

    let uri = format!("/api/v1/questions/exam/{}", exam_id);

    let (status, body) = app.get(&uri, &student).await;
    assert_eq!(status, StatusCode::OK);
    let questions = body.as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["id"].as_i64(), Some(q1));
    assert_eq!(questions[1]["id"].as_i64(), Some(q2));
    assert!(questions.iter().all(|q| q.get("correctAnswer").is_none()));
    assert_eq!(questions[0]["optionB"], "Mitochondrion");

    let (_, body) = app.get(&uri, &teacher).await;
    assert_eq!(body[0]["correctAnswer"], "optionB");

    let (status, _) = app.get(&format!("/api/v1/questions/{}", q1), &student).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn question_update_is_partial() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let exam_id = app.exam(&teacher, 30).await;
    let id = app.question(&teacher, exam_id, "optionB").await;

    let (status, body) = app
        .patch(
            &format!("/api/v1/questions/{}", id),
            &teacher,
            json!({ "optionC": "<b>Chloroplast</b><script>x</script>", "correctAnswer": "optionC" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["correctAnswer"], "optionC");
    assert_eq!(body["optionC"], "<b>Chloroplast</b>");
    assert_eq!(body["optionA"], "Nucleus");

    let (status, body) = app.get("/api/v1/questions", &teacher).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn half_right_scores_fifty_and_stays_unpublished() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;
    let q1 = app.question(&teacher, exam_id, "optionB").await;
    let q2 = app.question(&teacher, exam_id, "optionD").await;

    let (status, receipt) = app
        .post(
            &format!("/api/v1/students/exam/{}/write", exam_id),
            &student,
            json!({ "answers": [
                { "questionId": q1, "answer": "optionB" },
                { "questionId": q2, "answer": "optionA" },
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["totalQuestions"], 2);
    assert_eq!(receipt["answeredCount"], 2);
    assert!(receipt.get("score").is_none());

    let (_, results) = app.get("/api/v1/exam-results", &admin).await;
    let result = &results[0];
    assert_eq!(result["score"], 50.0);
    assert_eq!(result["status"], "passed");
    assert_eq!(result["grade"], "E");
    assert!(result["remarks"].is_null());
    assert_eq!(result["isPublished"], false);
    assert_eq!(result["answeredQuestions"][1]["isCorrect"], false);

    let (_, mine) = app.get("/api/v1/exam-results", &student).await;
    assert_eq!(mine[0]["displayStatus"], "pending");
    assert!(mine[0]["score"].is_null());
    assert!(mine[0]["grade"].is_null());
}

#[tokio::test]
async fn second_submission_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;
    let q1 = app.question(&teacher, exam_id, "optionA").await;

    let uri = format!("/api/v1/students/exam/{}/write", exam_id);
    let body = json!({ "answers": [{ "questionId": q1, "answer": "optionA" }] });

    let (status, _) = app.post(&uri, &student, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app.post(&uri, &student, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["message"], "You have already written this exam");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_results WHERE exam_id = ?")
        .bind(exam_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn malformed_answer_sheets_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;
    let other_exam = app.exam(&teacher, 30).await;
    let q1 = app.question(&teacher, exam_id, "optionA").await;
    let foreign = app.question(&teacher, other_exam, "optionA").await;

    let uri = format!("/api/v1/students/exam/{}/write", exam_id);
    let sheets = [
        json!({ "answers": [] }),
        json!({ "answers": [{ "questionId": foreign, "answer": "optionA" }] }),
        json!({ "answers": [
            { "questionId": q1, "answer": "optionA" },
            { "questionId": q1, "answer": "optionB" },
        ]}),
        json!({ "answers": [{ "questionId": q1, "answer": "E" }] }),
    ];

    for sheet in sheets {
        let (status, body) = app.post(&uri, &student, sheet.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}: {}", sheet, body);
    }

    let (status, _) = app
        .post("/api/v1/students/exam/9999/write", &student, json!({ "answers": [] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A rejected sheet does not use up the attempt.
    let (status, _) = app
        .post(&uri, &student, json!({ "answers": [{ "questionId": q1, "answer": "" }] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn mistyped_bodies_and_paths_use_the_error_envelope() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;
    app.question(&teacher, exam_id, "optionA").await;

    let (status, body) = app
        .post(
            &format!("/api/v1/students/exam/{}/write", exam_id),
            &student,
            json!({ "answers": "optionA" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let (status, body) = app
        .post("/api/v1/exams", &teacher, json!({ "name": "Geometry", "duration": "long" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");

    let (status, body) = app.get("/api/v1/exams/abc", &teacher).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn exam_without_questions_can_be_written() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;

    let (status, receipt) = app
        .post(
            &format!("/api/v1/students/exam/{}/write", exam_id),
            &student,
            json!({ "answers": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", receipt);
    assert_eq!(receipt["totalQuestions"], 0);
    assert_eq!(receipt["answeredCount"], 0);

    let (_, results) = app.get("/api/v1/exam-results", &admin).await;
    assert_eq!(results[0]["score"], 0.0);
    assert_eq!(results[0]["status"], "failed");
    assert_eq!(results[0]["grade"], "F");
}

#[tokio::test]
async fn text_that_is_only_markup_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let exam_id = app.exam(&teacher, 30).await;

    let (status, body) = app
        .post(
            &format!("/api/v1/questions/{}", exam_id),
            &teacher,
            json!({
                "question": "<script>x</script>",
                "optionA": "3", "optionB": "4", "optionC": "5", "optionD": "22",
                "correctAnswer": "optionB"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _) = app
        .patch(
            &format!("/api/v1/exams/{}", exam_id),
            &teacher,
            json!({ "name": "<script>alert(1)</script>" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let (_, exam) = app.get(&format!("/api/v1/exams/{}", exam_id), &teacher).await;
    assert_eq!(exam["name"], "Biology quiz");
}

#[tokio::test]
async fn publishing_reveals_the_score() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;
    let exam_id = app.exam(&teacher, 30).await;

    let (_, me) = app.get("/api/v1/users/me", &student).await;
    let student_id = me["id"].as_i64().unwrap();

    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exam_results
        (student_id, exam_id, score, correct_count, total_questions, status, grade, remarks,
         answered_questions, is_published, created_at)
        VALUES (?, ?, 42.0, 21, 50, 'failed', 'F', 'See me after class', '[]', FALSE, ?)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(chrono::Utc::now())
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let toggle = format!("/api/v1/exam-results/{}/admin-toggle-publish", result_id);

    let (status, _) = app.patch(&toggle, &student, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, mine) = app.get("/api/v1/exam-results", &student).await;
    assert!(mine[0]["remarks"].is_null());
    assert!(mine[0]["grade"].is_null());

    let (status, body) = app.patch(&toggle, &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isPublished"], true);

    let (_, mine) = app.get("/api/v1/exam-results", &student).await;
    assert_eq!(mine[0]["grade"], "F");
    assert_eq!(mine[0]["remarks"], "See me after class");
    assert_eq!(mine[0]["score"], 42.0);
    assert_eq!(mine[0]["displayStatus"], "failed");
    assert_eq!(mine[0]["examName"], "Biology quiz");

    let (_, body) = app.patch(&toggle, &admin, json!({})).await;
    assert_eq!(body["isPublished"], false);

    let (status, _) = app
        .patch("/api/v1/exam-results/9999/admin-toggle-publish", &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn result_detail_is_private_to_its_student() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let sam = app.user(&admin, "sam", "student").await;
    let sue = app.user(&admin, "sue", "student").await;
    let exam_id = app.exam(&teacher, 30).await;
    let q1 = app.question(&teacher, exam_id, "optionC").await;

    let (_, receipt) = app
        .post(
            &format!("/api/v1/students/exam/{}/write", exam_id),
            &sam,
            json!({ "answers": [{ "questionId": q1, "answer": "optionC" }] }),
        )
        .await;
    let detail = format!("/api/v1/exam-results/{}/checking", receipt["id"]);

    let (status, _) = app.get(&detail, &sue).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&detail, &sam).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["displayStatus"], "pending");
    assert!(body["answeredQuestions"].is_null());

    app.patch(
        &format!("/api/v1/exam-results/{}/admin-toggle-publish", receipt["id"]),
        &admin,
        json!({}),
    )
    .await;

    let (_, body) = app.get(&detail, &sam).await;
    assert_eq!(body["score"], 100.0);
    assert_eq!(body["grade"], "A");
    assert_eq!(body["answeredQuestions"][0]["selected"], "optionC");

    let (status, _) = app.get(&detail, &admin).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn statistics_cover_published_results_only() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let teacher = app.user(&admin, "tina", "teacher").await;
    let student = app.user(&admin, "sam", "student").await;

    let (status, stats) = app.get("/api/v1/exam-results/statistics", &student).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalExams"], 0);
    assert_eq!(stats["averageScore"], 0.0);

    let mut receipts = Vec::new();
    for answer in ["optionA", "optionB", ""] {
        let exam_id = app.exam(&teacher, 30).await;
        let q = app.question(&teacher, exam_id, "optionA").await;
        let (_, receipt) = app
            .post(
                &format!("/api/v1/students/exam/{}/write", exam_id),
                &student,
                json!({ "answers": [{ "questionId": q, "answer": answer }] }),
            )
            .await;
        receipts.push(receipt["id"].as_i64().unwrap());
    }

    // Publish the 100 and one of the 0s.
    for id in &receipts[..2] {
        app.patch(
            &format!("/api/v1/exam-results/{}/admin-toggle-publish", id),
            &admin,
            json!({}),
        )
        .await;
    }

    let (_, stats) = app.get("/api/v1/exam-results/statistics", &student).await;
    assert_eq!(stats["totalExams"], 3);
    assert_eq!(stats["publishedExams"], 2);
    assert_eq!(stats["averageScore"], 50.0);
    assert_eq!(stats["highestScore"], 100.0);
    assert_eq!(stats["lowestScore"], 0.0);
    assert_eq!(stats["passedExams"], 1);
    assert_eq!(stats["failedExams"], 1);

    let (status, _) = app.get("/api/v1/exam-results/statistics", &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
