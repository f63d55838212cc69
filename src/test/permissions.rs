#[cfg(test)]
mod tests {
    use crate::auth::{Permission, Role, grant_permissions};
    use crate::test::utils::test_db::TestDbBuilder;

    #[test]
    fn test_role_hierarchy_is_inclusive() {
        for permission in Role::Parent.permissions() {
            assert!(Role::Teacher.has_permission(*permission));
        }
        for permission in Role::Teacher.permissions() {
            assert!(Role::Principal.has_permission(*permission));
        }
        for permission in Role::Principal.permissions() {
            assert!(Role::Admin.has_permission(*permission));
        }

        assert_eq!(Role::Admin.permissions().len(), Permission::ALL.len());
        assert!(!Role::Parent.has_permission(Permission::StudentManage));
        assert!(!Role::Teacher.has_permission(Permission::UserManage));
        assert!(Role::Principal.has_permission(Permission::PageGuideManage));
    }

    #[test]
    fn test_codes_round_trip_and_unknowns_fail() {
        for permission in Permission::ALL {
            assert_eq!(Permission::from_code(permission.code()).unwrap(), permission);
        }
        assert!(Permission::from_code("student:fly").is_err());

        assert_eq!(Role::from_str("Teacher").unwrap(), Role::Teacher);
        assert_eq!(Role::from_str("ADMIN").unwrap(), Role::Admin);
        assert!(Role::from_str("janitor").is_err());
    }

    #[tokio::test]
    async fn test_grant_full_role_sets() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let summary = grant_permissions(&test_db.db, &Role::ALL, &[]).await.unwrap();

        let expected: usize = Role::ALL.iter().map(|r| r.permissions().len()).sum();
        assert_eq!(summary.roles_created, 4);
        assert_eq!(summary.permissions_created, Permission::ALL.len());
        assert_eq!(summary.granted, expected);
        assert_eq!(summary.already_present, 0);
        assert_eq!(test_db.count("role_permissions").await, expected as i64);
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let first = grant_permissions(&test_db.db, &[Role::Teacher], &[])
            .await
            .unwrap();

        let second = grant_permissions(&test_db.db, &[Role::Teacher], &[])
            .await
            .unwrap();

        assert_eq!(second.roles_created, 0);
        assert_eq!(second.permissions_created, 0);
        assert_eq!(second.granted, 0);
        assert_eq!(second.already_present, first.granted);
    }

    #[tokio::test]
    async fn test_grant_single_permission_to_role() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        grant_permissions(&test_db.db, &[Role::Parent], &[]).await.unwrap();

        let summary = grant_permissions(
            &test_db.db,
            &[Role::Parent],
            &[Permission::AiQuery, Permission::StudentView],
        )
        .await
        .unwrap();

        assert_eq!(summary.granted, 1);
        assert_eq!(summary.already_present, 1);

        let linked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM role_permissions rp \
             JOIN roles r ON r.id = rp.role_id \
             JOIN permissions p ON p.id = rp.permission_id \
             WHERE r.code = 'parent' AND p.code = 'ai:query'",
        )
        .fetch_one(test_db.db.pool())
        .await
        .unwrap();
        assert_eq!(linked, 1);
    }
}
